//! Runtime system
//!
//! This module contains the script scheduler, the program graph and the engine that
//! owns actors, threads and events.

pub mod deferred;
pub mod engine;
pub mod graph;
pub mod scheduler;
pub mod thread;
pub mod value;
