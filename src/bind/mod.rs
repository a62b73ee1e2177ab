//! Bindings - native functions ↔ engine functions
//!
//! Design: Signatures are tuples of native types. Marshaling code is
//! derived from them at compile time; the only runtime dispatch is the
//! fixed three-way branch on each type's class.
//!
//! Architecture:
//! - `classify.rs` - integral / floating-point / text classification
//! - `marshal.rs` - stack slot reads, push dispatch, tuple signatures
//! - `result.rs` - return values on both paths, void handling
//! - `export.rs` - entry point generation and registration
//! - `import.rs` - typed proxies for engine functions
//!
//! No arity or type checking happens at this layer. A signature that does
//! not match the other side yields whatever the engine's coercions yield.

mod classify;
mod marshal;
mod result;
mod export;
mod import;

pub use classify::{Classify, TypeClass};
pub use marshal::{Arguments, Param, Params, Push, Scalar};
pub use result::{Returned, Returns};
pub use export::{entry_point, export, register, NativeFn};
pub use import::{import, ImportedFn, Proxy, Reply};
