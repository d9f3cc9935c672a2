//! Final result of an invocation.

use crate::signal::{Signal, SignalStatus};
use cmdlang::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecMessage {
    pub status: SignalStatus,
    /// Commands attempted, in input order, including the one that halted.
    pub commands: Vec<String>,
    pub text: String,
    pub varnames: Vec<String>,
    pub response: Value,
}

impl ExecMessage {
    /// Folds the last signal obtained (if any) and the attempted commands.
    /// Without a signal the result is a plain `ok` with empty fields.
    pub fn aggregate(signal: Option<Signal>, commands: Vec<String>) -> Self {
        let signal = signal.unwrap_or_default();
        ExecMessage {
            status: signal.status,
            commands,
            text: signal.text,
            varnames: signal.varnames,
            response: signal.response,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SignalStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_signal_aggregates_to_default_ok() {
        let message = ExecMessage::aggregate(None, Vec::new());
        assert!(message.is_ok());
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"status": "ok", "commands": [], "text": "", "varnames": [], "response": null})
        );
    }

    #[test]
    fn signal_fields_are_carried_over() {
        let signal = Signal::error("boom")
            .with_varnames(["a"])
            .with_response(Value::Integer(2));
        let message = ExecMessage::aggregate(Some(signal), vec!["a = 1".into()]);
        assert_eq!(message.status, SignalStatus::Error);
        assert_eq!(message.text, "boom");
        assert_eq!(message.varnames, vec!["a"]);
        assert_eq!(message.response, Value::Integer(2));
        assert_eq!(message.commands, vec!["a = 1"]);
    }
}
