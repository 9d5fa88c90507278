//! blockvm: a cooperative block-program virtual machine
//!
//! Runs block-based visual programs: every actor owns a graph of blocks, every running
//! script is a green thread, and one [`Runtime::step`] per frame interleaves them under
//! a time budget. The host feeds input through IO devices and reads state back.
//!
//! # Example
//!
//! ```rust
//! use blockvm::{EngineConfig, Runtime, ScriptBuilder, Value};
//!
//! let mut builder = ScriptBuilder::new();
//! let set = builder.command("data_setvariableto", &[("VALUE", Value::from(42.0))]);
//! builder.field(set, "VARIABLE", "answer", None);
//! builder.script("event_whenflagclicked", &[set]);
//!
//! let mut rt = Runtime::new(EngineConfig::default());
//! let cat = rt.add_sprite("Cat", builder.build());
//! rt.green_flag();
//! rt.step();
//!
//! let answer = rt
//!     .target(cat)
//!     .and_then(|cat| cat.variable_by_name("answer", blockvm::VariableKind::Scalar))
//!     .map(|variable| variable.get());
//! assert_eq!(answer, Some(Value::Number(42.0)));
//! ```
//!
//! # Crate Features
//!
//! - `debug`: extra tracing of every executed block

#![doc(html_root_url = "https://docs.rs/blockvm")]
#![warn(rust_2018_idioms)]

// Engine
pub mod io;
pub mod primitives;
pub mod project;
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use io::{CloudProvider, IoEvent};
pub use primitives::{Args, Flow, PrimitiveError};
pub use project::Project;
pub use runtime::engine::{
    EngineError, EngineResult, Event, ExtensionHandler, Runtime, Target, TargetId, ThreadFault,
    Variable, VariableKind,
};
pub use runtime::graph::{BlockId, Blocks, Opcode, ScriptBuilder};
pub use runtime::scheduler::BlockUtility;
pub use runtime::thread::ThreadId;
pub use runtime::value::Value;
pub use util::config::EngineConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name
pub const NAME: &str = "blockvm";
