//! Import path - engine functions callable from native code
//!
//! A `Proxy` pairs an engine handle with a global name and a fixed
//! signature. Each call is self-contained: resolve the global, push the
//! arguments, call for one result, read it back.
//!
//! An `ImportedFn` is the same signature without an engine: any number of
//! them can be held at once, each borrowing the engine only for the call
//! it makes. Its result lives in a `Reply` that releases the slot on drop.

use super::marshal::Arguments;
use super::result::Returned;
use crate::engine::{Engine, EngineError};
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Typed handle to a globally named engine function
///
/// The proxy borrows the engine exclusively, so only one call sequence can
/// be in flight against it. The result of the latest call stays on the
/// stack until the next call (or drop), which is what lets a `&str`
/// result borrow it.
pub struct Proxy<'e, E: Engine, P, R> {
    engine: &'e mut E,
    name: String,
    pending: Option<usize>,
    _signature: PhantomData<fn(P) -> R>,
}

/// Create a proxy for the engine function bound to `name`
///
/// The name is not resolved until the first call; a missing global
/// surfaces as the engine's own call failure.
pub fn import<P, R, E>(engine: &mut E, name: impl Into<String>) -> Proxy<'_, E, P, R>
where
    P: Arguments,
    R: Returned,
    E: Engine,
{
    let name = name.into();
    debug!(name = %name, arity = P::ARITY, result = ?R::CLASS, "importing");
    Proxy {
        engine,
        name,
        pending: None,
        _signature: PhantomData,
    }
}

impl<'e, E: Engine, P: Arguments, R: Returned> Proxy<'e, E, P, R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the engine function with `args`
    ///
    /// Engine call failures are passed through untouched.
    pub fn call(&mut self, args: P) -> Result<R::Output<'_>, EngineError> {
        self.release();

        let base = self.engine.top();
        self.pending = Some(base);
        call_global(&mut *self.engine, &self.name, args)?;

        let engine: &E = &*self.engine;
        Ok(R::read(engine, engine.top()))
    }

    /// Drop whatever the previous call left on the stack
    fn release(&mut self) {
        if let Some(base) = self.pending.take() {
            self.engine.set_top(base);
        }
    }
}

impl<'e, E: Engine, P, R> Drop for Proxy<'e, E, P, R> {
    fn drop(&mut self) {
        if let Some(base) = self.pending.take() {
            self.engine.set_top(base);
        }
    }
}

impl<'e, E: Engine, P, R> fmt::Debug for Proxy<'e, E, P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("name", &self.name)
            .field("pending", &self.pending)
            .finish()
    }
}

/// Resolve `name`, push `args` and call for exactly one result
fn call_global<E: Engine, P: Arguments>(
    engine: &mut E,
    name: &str,
    args: P,
) -> Result<(), EngineError> {
    engine.get_global(name);
    args.push_all(engine);
    trace!(name, nargs = P::ARITY, "calling engine function");
    engine.call(P::ARITY, 1)
}

/// Typed signature of a globally named engine function, detached from
/// any engine
pub struct ImportedFn<P, R> {
    name: String,
    _signature: PhantomData<fn(P) -> R>,
}

impl<P: Arguments, R: Returned> ImportedFn<P, R> {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug!(name = %name, arity = P::ARITY, result = ?R::CLASS, "importing");
        Self {
            name,
            _signature: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Proxy bound to `engine` for a run of calls
    pub fn bind<'e, E: Engine>(&self, engine: &'e mut E) -> Proxy<'e, E, P, R> {
        import(engine, self.name.clone())
    }

    /// Invoke the engine function with `args`
    ///
    /// The result stays on the stack until the returned `Reply` is dropped.
    pub fn call<'e, E: Engine>(
        &self,
        engine: &'e mut E,
        args: P,
    ) -> Result<Reply<'e, E, R>, EngineError> {
        let base = engine.top();
        if let Err(e) = call_global(engine, &self.name, args) {
            engine.set_top(base);
            return Err(e);
        }
        Ok(Reply {
            engine,
            base,
            _result: PhantomData,
        })
    }
}

impl<P, R> Clone for ImportedFn<P, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _signature: PhantomData,
        }
    }
}

impl<P, R> fmt::Debug for ImportedFn<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportedFn").field("name", &self.name).finish()
    }
}

/// Result of one `ImportedFn::call`, held on the engine stack
pub struct Reply<'e, E: Engine, R> {
    engine: &'e mut E,
    base: usize,
    _result: PhantomData<fn() -> R>,
}

impl<'e, E: Engine, R: Returned> Reply<'e, E, R> {
    pub fn value(&self) -> R::Output<'_> {
        let engine: &E = &*self.engine;
        R::read(engine, engine.top())
    }
}

impl<'e, E: Engine, R> Drop for Reply<'e, E, R> {
    fn drop(&mut self) {
        self.engine.set_top(self.base);
    }
}

impl<'e, E: Engine, R> fmt::Debug for Reply<'e, E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply").field("base", &self.base).finish()
    }
}
