//! Export path - native functions callable from the engine
//!
//! Design: `NativeFn<P, R>` is implemented once per arity for every
//! `Fn` whose parameters are the `Param` values of `P`. The impl is the
//! whole generated entry point: marshal slots `1..=ARITY`, invoke, convert
//! the result. No per-binding glue is written by hand.

use super::marshal::{Param, Params};
use super::result::Returns;
use crate::engine::{Engine, NativeEntry};
use std::rc::Rc;
use tracing::{debug, trace};

/// A native function with parameter list `P` and return type `R`
pub trait NativeFn<P: Params, R: Returns>: 'static {
    /// Run one call against the current frame; returns the result count
    fn invoke<E: Engine>(&self, engine: &mut E) -> usize;
}

macro_rules! native_fn {
    ($($name:ident $arg:ident),*) => {
        impl<Func, R, $($name),*> NativeFn<($($name,)*), R> for Func
        where
            Func: for<'a> Fn($($name::Value<'a>),*) -> R + 'static,
            R: Returns,
            $($name: Param,)*
        {
            #[inline]
            fn invoke<E: Engine>(&self, engine: &mut E) -> usize {
                let result = {
                    let ($($arg,)*) = <($($name,)*) as Params>::read(&*engine);
                    (self)($($arg),*)
                };
                result.push_result(engine)
            }
        }
    };
}

native_fn!();
native_fn!(A a);
native_fn!(A a, B b);
native_fn!(A a, B b, C c);
native_fn!(A a, B b, C c, D d);
native_fn!(A a, B b, C c, D d, F f);
native_fn!(A a, B b, C c, D d, F f, G g);
native_fn!(A a, B b, C c, D d, F f, G g, H h);
native_fn!(A a, B b, C c, D d, F f, G g, H h, I i);

/// Generate the native-callable entry point for `function`
///
/// The parameter list must be named explicitly; the return type is
/// inferred:
///
/// ```
/// use stackbind::bind::entry_point;
/// use stackbind::vm::Vm;
///
/// fn area(w: i64, h: i64) -> i64 { w * h }
///
/// let entry = entry_point::<(i64, i64), _, Vm>(area);
/// ```
pub fn entry_point<P, R, E>(function: impl NativeFn<P, R>) -> NativeEntry<E>
where
    P: Params + 'static,
    R: Returns + 'static,
    E: Engine,
{
    Rc::new(move |engine: &mut E| {
        trace!(arity = P::ARITY, "native entry invoked");
        function.invoke(engine)
    })
}

/// Bind `entry` to `name` in the engine's global namespace
///
/// Any previous binding under `name` is replaced.
pub fn register<E: Engine>(engine: &mut E, name: &str, entry: NativeEntry<E>) {
    engine.push_native(entry);
    engine.set_global(name);
    debug!(name, "registered native function");
}

/// Generate an entry point for `function` and register it under `name`
///
/// ```
/// use stackbind::bind::export;
/// use stackbind::vm::Vm;
///
/// fn shout(text: &str) -> i64 { text.len() as i64 }
///
/// let mut vm = Vm::new();
/// export::<(&str,), _>(&mut vm, "shout", shout);
/// ```
pub fn export<P, R>(engine: &mut impl Engine, name: &str, function: impl NativeFn<P, R>)
where
    P: Params + 'static,
    R: Returns + 'static,
{
    debug!(name, arity = P::ARITY, results = R::COUNT, classes = ?P::CLASSES, "exporting");
    register(engine, name, entry_point::<P, R, _>(function));
}
