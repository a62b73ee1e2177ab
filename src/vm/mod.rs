//! Reference embedded runtime
//!
//! A dynamically typed, stack-based interpreter implementing `Engine`.
//! Values are exchanged through an operand stack addressed by 1-based
//! slots relative to the running call frame; globals live in one flat
//! namespace. Script functions and native entry points are called through
//! the same `call(nargs, nresults)` protocol.
//!
//! `Vm` is neither `Send` nor `Sync`: one handle, one thread.

mod interp;
mod stdlib;
mod value;

pub use value::{format_number, parse_number, ScriptFunction, Value};

use crate::config::VmConfig;
use crate::engine::{Engine, EngineError, Integer, NativeEntry, Number, Slot};
use crate::script;
use once_cell::unsync::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};

/// One operand stack entry
///
/// `text` caches the string form of a number the first time the slot is
/// read as text, so the returned view can borrow the stack.
struct StackEntry {
    value: Value,
    text: OnceCell<Box<str>>,
}

impl StackEntry {
    fn new(value: Value) -> Self {
        Self {
            value,
            text: OnceCell::new(),
        }
    }
}

/// Upper bound on `VmConfig::max_call_depth`
///
/// Every script call nests several native frames, so deeper limits would
/// overflow the native stack before `StackOverflow` is reported.
pub const MAX_CALL_DEPTH: usize = 200;

pub struct Vm {
    stack: Vec<StackEntry>,
    /// Absolute stack index of slot 1 for every active call
    frames: Vec<usize>,
    globals: HashMap<String, Value>,
    config: VmConfig,
    printed: Vec<String>,
}

impl Vm {
    /// Fresh state with an empty global namespace
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(mut config: VmConfig) -> Self {
        if config.max_call_depth > MAX_CALL_DEPTH {
            warn!(
                requested = config.max_call_depth,
                limit = MAX_CALL_DEPTH,
                "max_call_depth clamped"
            );
            config.max_call_depth = MAX_CALL_DEPTH;
        }
        Self {
            stack: Vec::new(),
            frames: Vec::new(),
            globals: HashMap::new(),
            config,
            printed: Vec::new(),
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Install `print`, `tostring`, `tonumber` and `type`
    pub fn open_libs(&mut self) {
        stdlib::open(self);
    }

    /// Read, compile and run a script file
    pub fn load_and_run(&mut self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.exec(&path.display().to_string(), &source)
    }

    /// Compile and run `source` as the body of a zero-argument function
    pub fn exec(&mut self, chunk: &str, source: &str) -> Result<(), EngineError> {
        let body = script::parse(source).map_err(|e| EngineError::Syntax {
            chunk: chunk.to_string(),
            line: e.line,
            message: e.message,
        })?;

        debug!(chunk, statements = body.len(), "running chunk");
        let main = ScriptFunction {
            name: "main chunk".to_string(),
            chunk: chunk.into(),
            params: Vec::new(),
            body,
        };
        self.push_value(Value::Function(Rc::new(main)));
        self.call(0, 0).map_err(|e| {
            warn!(chunk, error = %e, "chunk failed");
            e
        })
    }

    /// Current binding of a global
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Lines written by `print` while `capture_print` is set
    pub fn printed(&self) -> &[String] {
        &self.printed
    }

    pub fn take_printed(&mut self) -> Vec<String> {
        std::mem::take(&mut self.printed)
    }

    /// Active call depth
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn base(&self) -> usize {
        self.frames.last().copied().unwrap_or(0)
    }

    fn entry(&self, slot: Slot) -> Option<&StackEntry> {
        if slot == 0 {
            return None;
        }
        self.stack.get(self.base() + slot - 1)
    }

    /// Value at `slot` in the current frame (nil when absent)
    pub fn value_at(&self, slot: Slot) -> Value {
        self.entry(slot)
            .map(|entry| entry.value.clone())
            .unwrap_or(Value::Nil)
    }

    pub fn push_value(&mut self, value: Value) {
        self.stack.push(StackEntry::new(value));
    }

    /// Pop the top value of the current frame (nil when the frame is empty)
    pub fn pop_value(&mut self) -> Value {
        if self.stack.len() > self.base() {
            self.stack.pop().map(|entry| entry.value).unwrap_or(Value::Nil)
        } else {
            Value::Nil
        }
    }

    pub(crate) fn record_print(&mut self, line: String) {
        if self.config.capture_print {
            self.printed.push(line);
        } else {
            println!("{}", line);
        }
    }

    fn invoke(&mut self, callee: Value, nargs: usize) -> Result<usize, EngineError> {
        match callee {
            Value::Native(entry) => Ok(entry(self)),
            Value::Function(function) => self.run_script(&function, nargs),
            other => Err(EngineError::NotCallable {
                type_name: other.type_name(),
            }),
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Vm {
    fn push_integer(&mut self, value: Integer) {
        self.push_value(Value::Integer(value));
    }

    fn push_float(&mut self, value: Number) {
        self.push_value(Value::Float(value));
    }

    fn push_string(&mut self, value: &str) {
        self.push_value(Value::string(value));
    }

    fn push_native(&mut self, entry: NativeEntry<Self>) {
        self.push_value(Value::Native(entry));
    }

    fn to_integer(&self, slot: Slot) -> Integer {
        self.entry(slot)
            .and_then(|entry| entry.value.to_integer())
            .unwrap_or(0)
    }

    fn to_float(&self, slot: Slot) -> Number {
        self.entry(slot)
            .and_then(|entry| entry.value.to_number())
            .unwrap_or(0.0)
    }

    fn to_str(&self, slot: Slot) -> &str {
        let entry = match self.entry(slot) {
            Some(entry) => entry,
            None => return "",
        };
        match &entry.value {
            Value::Str(text) => &**text,
            number @ (Value::Integer(_) | Value::Float(_)) => {
                &**entry.text.get_or_init(|| number.to_string().into_boxed_str())
            }
            _ => "",
        }
    }

    fn top(&self) -> usize {
        self.stack.len() - self.base()
    }

    fn set_top(&mut self, top: usize) {
        let target = self.base() + top;
        if target <= self.stack.len() {
            self.stack.truncate(target);
        } else {
            self.stack.resize_with(target, || StackEntry::new(Value::Nil));
        }
    }

    fn get_global(&mut self, name: &str) {
        let value = self.globals.get(name).cloned().unwrap_or(Value::Nil);
        self.push_value(value);
    }

    fn set_global(&mut self, name: &str) {
        match self.pop_value() {
            Value::Nil => {
                self.globals.remove(name);
            }
            value => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    fn call(&mut self, nargs: usize, nresults: usize) -> Result<(), EngineError> {
        let available = self.top();
        if available < nargs + 1 {
            return Err(EngineError::StackUnderflow {
                needed: nargs + 1,
                available,
            });
        }

        let callee_index = self.stack.len() - nargs - 1;
        if self.frames.len() >= self.config.max_call_depth {
            self.stack.truncate(callee_index);
            return Err(EngineError::StackOverflow {
                depth: self.config.max_call_depth,
            });
        }

        let callee = self.stack[callee_index].value.clone();
        self.frames.push(callee_index + 1);
        let outcome = self.invoke(callee, nargs);
        self.frames.pop();

        let produced = match outcome {
            Ok(produced) => produced,
            Err(e) => {
                self.stack.truncate(callee_index);
                return Err(e);
            }
        };

        // Results are the top `produced` values of the finished frame
        let frame_len = self.stack.len() - (callee_index + 1);
        let first = self.stack.len() - produced.min(frame_len);
        let mut results: Vec<StackEntry> = self.stack.drain(first..).collect();
        self.stack.truncate(callee_index);

        results.truncate(nresults);
        let missing = nresults - results.len();
        self.stack.extend(results);
        for _ in 0..missing {
            self.push_value(Value::Nil);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
