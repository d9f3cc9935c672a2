use cmdlang::{CompileError, RewriteError};
use thiserror::Error;

/// Failures that abort an invocation before any signal exists. Runtime
/// failures of a command are not errors here; they become error signals.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("failed to rewrite command {index} ({command:?}): {source}")]
    Rewrite {
        index: usize,
        command: String,
        #[source]
        source: RewriteError,
    },

    #[error("failed to compile command {index} ({command:?}): {source}")]
    Compile {
        index: usize,
        command: String,
        #[source]
        source: CompileError,
    },
}

impl ExecError {
    /// Position of the offending command in the input.
    pub fn index(&self) -> usize {
        match self {
            ExecError::Rewrite { index, .. } | ExecError::Compile { index, .. } => *index,
        }
    }
}
