// Error handling for the command runtime

use std::fmt;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised while a command is running. Every variant becomes the text of
/// an error signal, so the `Display` output is what an agent ends up reading.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Type errors (wrong type for operation)
    TypeError {
        expected: String,
        actual: String,
        operation: String,
    },

    /// Name bound neither by the command nor by the context
    UndefinedName(String),

    DivisionByZero,

    /// Integer arithmetic left the i64 range
    Overflow(String),

    IndexOutOfBounds {
        index: i64,
        length: usize,
    },

    /// Sequence repetition would grow past the allowed length
    SequenceTooLong {
        limit: usize,
    },

    KeyNotFound {
        key: String,
    },

    AttributeNotFound {
        type_name: String,
        attribute: String,
    },

    /// Value is not callable
    NotCallable(String),

    /// `await` applied to something that is not a coroutine
    NotAwaitable(String),

    /// A coroutine can only be driven once
    CoroutineAlreadyAwaited(String),

    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    MissingArgument {
        function: String,
        name: String,
    },

    InvalidArgument(String),

    Generic(String),
}

impl RuntimeError {
    pub fn new(message: &str) -> RuntimeError {
        RuntimeError::Generic(message.to_string())
    }

    pub fn type_error(
        expected: impl Into<String>,
        actual: impl Into<String>,
        operation: impl Into<String>,
    ) -> RuntimeError {
        RuntimeError::TypeError {
            expected: expected.into(),
            actual: actual.into(),
            operation: operation.into(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::TypeError {
                expected,
                actual,
                operation,
            } => write!(
                f,
                "Type error in {}: expected {}, got {}",
                operation, expected, actual
            ),
            RuntimeError::UndefinedName(name) => write!(f, "name '{}' is not defined", name),
            RuntimeError::DivisionByZero => write!(f, "Division by zero"),
            RuntimeError::Overflow(operation) => {
                write!(f, "Integer overflow in {}", operation)
            }
            RuntimeError::IndexOutOfBounds { index, length } => write!(
                f,
                "Index {} out of bounds for sequence of length {}",
                index, length
            ),
            RuntimeError::SequenceTooLong { limit } => write!(
                f,
                "Repeated sequence would be longer than {} items",
                limit
            ),
            RuntimeError::KeyNotFound { key } => write!(f, "Key not found: '{}'", key),
            RuntimeError::AttributeNotFound {
                type_name,
                attribute,
            } => write!(
                f,
                "'{}' object has no attribute '{}'",
                type_name, attribute
            ),
            RuntimeError::NotCallable(type_name) => {
                write!(f, "'{}' object is not callable", type_name)
            }
            RuntimeError::NotAwaitable(type_name) => write!(
                f,
                "object of type '{}' can't be used in 'await' expression",
                type_name
            ),
            RuntimeError::CoroutineAlreadyAwaited(name) => {
                write!(f, "cannot reuse already awaited coroutine '{}'", name)
            }
            RuntimeError::ArityMismatch {
                function,
                expected,
                actual,
            } => write!(
                f,
                "Arity mismatch in function '{}': expected {}, got {}",
                function, expected, actual
            ),
            RuntimeError::MissingArgument { function, name } => write!(
                f,
                "{}() missing required argument: '{}'",
                function, name
            ),
            RuntimeError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            RuntimeError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reads_like_a_traceback_line() {
        assert_eq!(
            RuntimeError::UndefinedName("undefined_name".into()).to_string(),
            "name 'undefined_name' is not defined"
        );
        assert_eq!(
            RuntimeError::type_error("int or float", "str", "-").to_string(),
            "Type error in -: expected int or float, got str"
        );
    }
}
