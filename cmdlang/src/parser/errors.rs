use super::Rule;
use crate::ast::Span;
use itertools::Itertools;
use pest::error::{ErrorVariant, LineColLocation};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The grammar rejected the input.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    /// The input matched the grammar but could not be turned into an AST node.
    #[error("invalid {construct}: {message}")]
    Invalid {
        construct: &'static str,
        message: String,
        span: Option<Span>,
    },
}

impl ParseError {
    pub fn invalid(construct: &'static str, message: impl Into<String>, span: Span) -> Self {
        ParseError::Invalid {
            construct,
            message: message.into(),
            span: Some(span),
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        let message = match &err.variant {
            ErrorVariant::ParsingError {
                positives,
                negatives,
            } => describe_rules(positives, negatives),
            ErrorVariant::CustomError { message } => message.clone(),
        };
        ParseError::Syntax {
            message,
            line,
            column,
        }
    }
}

fn describe_rules(positives: &[Rule], negatives: &[Rule]) -> String {
    match (positives.is_empty(), negatives.is_empty()) {
        (true, true) => "unexpected input".to_string(),
        (false, _) => format!(
            "expected {}",
            positives.iter().map(|rule| rule_name(*rule)).join(", ")
        ),
        (true, false) => format!(
            "unexpected {}",
            negatives.iter().map(|rule| rule_name(*rule)).join(", ")
        ),
    }
}

fn rule_name(rule: Rule) -> String {
    match rule {
        Rule::EOI => "end of input".to_string(),
        Rule::identifier => "identifier".to_string(),
        Rule::expression | Rule::positional_argument => "expression".to_string(),
        other => format!("{:?}", other).replace('_', " "),
    }
}
