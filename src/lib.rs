//! stackbind - typed bindings between native Rust functions and a
//! stack-based embedded runtime
//!
//! Export a function so scripts can call it, or import a script function
//! as a typed proxy:
//!
//! ```
//! use stackbind::{bind, Vm};
//!
//! fn simple(_x: i32, y: &str) -> i32 { y.len() as i32 }
//!
//! let mut vm = Vm::new();
//! bind::export::<(i32, &str), _>(&mut vm, "simple", simple);
//! vm.exec("demo", "function wrapper(x, y)\n  return simple(x, y)\nend").unwrap();
//!
//! let mut wrapper = bind::import::<(i32, &str), i32, _>(&mut vm, "wrapper");
//! assert_eq!(wrapper.call((42, "is the answer")).unwrap(), 13);
//! ```

// Core modules
pub mod bind;
pub mod engine;
pub mod vm;
pub mod script;

// Infrastructure
pub mod config;
pub mod logging;

// Re-export commonly used items
pub use bind::{entry_point, export, import, register, ImportedFn, Proxy, TypeClass};
pub use config::{Config, ConfigError, VmConfig};
pub use engine::{Engine, EngineError, Integer, NativeEntry, Number, Slot};
pub use logging::{init_logging, LogConfig, LogFormat, LogOutput};
pub use vm::{Value, Vm};
