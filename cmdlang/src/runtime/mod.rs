//! Command runtime
//!
//! Values, the shared context, operator semantics, the async evaluator and
//! the unit synthesizer that ties them together.

pub mod context;
pub mod error;
pub mod evaluator;
pub mod operators;
pub mod stdlib;
pub mod unit;
pub mod values;

pub use context::{Bindings, Context};
pub use error::{RuntimeError, RuntimeResult};
pub use evaluator::{Evaluation, Evaluator, PathSegment};
pub use stdlib::Prelude;
pub use unit::{CompileError, Unit};
pub use values::{CallArgs, CallKind, Coroutine, Function, Value};
