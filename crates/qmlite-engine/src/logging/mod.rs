//! Logger setup.
//!
//! The rest of the crate only talks to the `log` facade. Engine warnings
//! (unknown properties, binding loops) use the module targets; document
//! `console.*` calls log under [`SCRIPT_TARGET`].

mod init;

pub use init::{LoggingConfig, SCRIPT_TARGET, init_logging};
