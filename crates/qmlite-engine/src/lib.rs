//! Runtime for **qmlite** documents: reactive objects, properties with
//! bindings, signals, states, transitions, animations and timers, plus the
//! script interpreter that evaluates bindings and handlers.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`engine`] | `Engine`: operation state, init phase, tick scheduler, type registry |
//! | [`object`] | `Object`, `Kind`, `Context` (component scopes) |
//! | [`property`] | `Property` cells, assignment and dependency tracking |
//! | [`signal`] | `Signal`, `Slot`, `Receiver` |
//! | [`binding`] | `Binding`: compiled property expressions |
//! | [`meta`] | `MetaElement`: documents compiled to element templates |
//! | [`construct`] | instantiation of templates |
//! | [`registry`] | `TypeRegistry`, element factories |
//! | [`elements`] | built-in element types |
//! | [`script`] | interpreter, scopes and global objects |
//! | [`value`] | `Value`, `Function` |
//! | [`error`] | `EvalError`, `CompileError`, `EngineError` |
//! | [`config`] | `EngineConfig` |
//! | [`time`] | `TickClock` for hosts driving the tick loop |
//! | [`logging`] | `env_logger` setup |
//!
//! # Quick start
//!
//! ```rust
//! use qmlite_engine::{Engine, Value};
//!
//! let engine = Engine::default();
//! let root = engine
//!     .compile_and_instantiate("Item { width: 10; height: width * 2 }", None)
//!     .unwrap();
//! root.set(&engine, "width", 21).unwrap();
//! assert!(root.get(&engine, "height").unwrap().strict_eq(&Value::Number(42.0)));
//! ```

pub mod binding;
pub mod config;
pub mod construct;
pub mod elements;
pub mod engine;
pub mod error;
pub mod logging;
pub mod meta;
pub mod object;
pub mod property;
pub mod registry;
pub mod script;
pub mod signal;
pub mod time;
pub mod value;

pub use binding::Binding;
pub use config::EngineConfig;
pub use engine::{Engine, OperationState};
pub use error::{CompileError, EngineError, EvalError};
pub use logging::{LoggingConfig, SCRIPT_TARGET, init_logging};
pub use meta::{compile, parse_and_compile, MetaElement, MetaValue};
pub use object::{Context, Kind, Object, ObjectRef};
pub use property::{Assignment, EvalScope, Property};
pub use registry::{CreateArgs, Factory, TypeRegistry};
pub use script::run_script;
pub use signal::{Receiver, Signal, Slot};
pub use time::{Tick, TickClock};
pub use value::{Function, Value};
