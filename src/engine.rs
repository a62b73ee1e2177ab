//! Engine boundary - the primitive stack operations bindings are built on
//!
//! Design: The embedded runtime is an opaque collaborator. Everything the
//! bridge needs from it is one push, one read and one namespace primitive
//! per value kind, plus `call`. Any runtime exposing this set can host
//! exported functions and serve imported ones.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Integer representation used by the engine stack
pub type Integer = i64;

/// Floating-point representation used by the engine stack
pub type Number = f64;

/// 1-based position in the operand stack of the current call frame
pub type Slot = usize;

/// Native-callable entry point
///
/// Receives the engine with the call's arguments in slots `1..=nargs` and
/// returns how many values it left on top of the stack as results.
pub type NativeEntry<E> = Rc<dyn Fn(&mut E) -> usize>;

/// Primitive operations of a stack-based embedded runtime
///
/// None of these are safe to interleave from several threads; a handle
/// serves one call sequence at a time.
pub trait Engine: Sized + 'static {
    fn push_integer(&mut self, value: Integer);

    fn push_float(&mut self, value: Number);

    fn push_string(&mut self, value: &str);

    /// Push a native-callable entry point as a function value
    fn push_native(&mut self, entry: NativeEntry<Self>);

    /// Read a slot as an integer, coercing the way the runtime does
    fn to_integer(&self, slot: Slot) -> Integer;

    /// Read a slot as a float, coercing the way the runtime does
    fn to_float(&self, slot: Slot) -> Number;

    /// Borrow the string representation of a slot
    ///
    /// The view lives on the stack. It is valid until the slot is popped
    /// or the frame that owns it returns.
    fn to_str(&self, slot: Slot) -> &str;

    /// Number of values in the current frame
    fn top(&self) -> usize;

    /// Truncate (or pad with nil) the current frame to `top` values
    fn set_top(&mut self, top: usize);

    /// Push the value bound to `name` in the global namespace
    fn get_global(&mut self, name: &str);

    /// Pop the top value and bind it to `name` in the global namespace
    fn set_global(&mut self, name: &str);

    /// Call the value sitting below the top `nargs` values
    ///
    /// Callee and arguments are consumed; exactly `nresults` values are
    /// left in their place on success.
    fn call(&mut self, nargs: usize, nresults: usize) -> Result<(), EngineError>;
}

/// Failures reported by an engine
#[derive(Debug)]
pub enum EngineError {
    NotCallable { type_name: &'static str },
    StackUnderflow { needed: usize, available: usize },
    StackOverflow { depth: usize },
    Runtime { message: String },
    Syntax { chunk: String, line: usize, message: String },
    Io { path: PathBuf, source: std::io::Error },
}

impl EngineError {
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime { message: message.into() }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCallable { type_name } => {
                write!(f, "attempt to call a {} value", type_name)
            }
            Self::StackUnderflow { needed, available } => {
                write!(f, "stack underflow: needed {} values, {} available", needed, available)
            }
            Self::StackOverflow { depth } => {
                write!(f, "stack overflow: call depth exceeded {}", depth)
            }
            Self::Runtime { message } => write!(f, "{}", message),
            Self::Syntax { chunk, line, message } => {
                write!(f, "{}:{}: {}", chunk, line, message)
            }
            Self::Io { path, source } => {
                write!(f, "cannot open {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
