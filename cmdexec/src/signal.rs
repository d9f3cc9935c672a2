//! Outcome signals and the single-slot mailbox that carries them.

use cmdlang::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    #[default]
    Ok,
    Warning,
    Error,
}

impl SignalStatus {
    /// Whether a signal with this status stops the command sequence.
    pub fn halts(&self) -> bool {
        !matches!(self, SignalStatus::Ok)
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalStatus::Ok => write!(f, "ok"),
            SignalStatus::Warning => write!(f, "warning"),
            SignalStatus::Error => write!(f, "error"),
        }
    }
}

/// Outcome a provider reports for the command that just ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Signal {
    pub status: SignalStatus,
    #[serde(default)]
    pub text: String,
    /// Context names the command touched, in the order reported.
    #[serde(default)]
    pub varnames: Vec<String>,
    #[serde(default)]
    pub response: Value,
}

impl Signal {
    pub fn new(status: SignalStatus, text: impl Into<String>) -> Self {
        Signal {
            status,
            text: text.into(),
            varnames: Vec::new(),
            response: Value::None,
        }
    }

    pub fn ok(text: impl Into<String>) -> Self {
        Self::new(SignalStatus::Ok, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(SignalStatus::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(SignalStatus::Error, text)
    }

    pub fn with_varnames<I, S>(mut self, varnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.varnames = varnames.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = response;
        self
    }
}

/// Take-and-clear mailbox holding at most one signal. Clones share the slot,
/// so tool closures can record into the mailbox their provider reads from.
#[derive(Debug, Clone, Default)]
pub struct SignalSlot {
    inner: Arc<Mutex<Option<Signal>>>,
}

impl SignalSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `signal`, returning the one it replaced if it was never taken.
    pub fn record(&self, signal: Signal) -> Option<Signal> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(signal)
    }

    pub fn peek(&self) -> Option<Signal> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Option<Signal> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn clear(&self) {
        self.take();
    }

    pub fn is_pending(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
