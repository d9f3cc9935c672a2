//! Command executor
//!
//! Drives agent-produced commands against a shared [`cmdlang::Context`],
//! collecting a [`Signal`] from a [`Provider`] after each one and stopping at
//! the first problem.

pub mod config;
pub mod demo;
pub mod error;
pub mod executor;
pub mod message;
pub mod provider;
pub mod signal;

pub use config::{ConfigError, ExecutorConfig};
pub use error::ExecError;
pub use executor::{execute, ExecOutcome, ExecState, Executor};
pub use message::ExecMessage;
pub use provider::{Provider, ToolHandler, ToolOutput, ToolProvider};
pub use signal::{Signal, SignalSlot, SignalStatus};
