use crate::ast::{Expression, Program};
use pest::Parser;

// Declare submodules
mod common;
pub mod errors;
mod expressions;
mod statements;

pub use errors::ParseError;
use expressions::build_expression;
use statements::build_program;

// Define the parser struct using the grammar file
#[derive(pest_derive::Parser)]
#[grammar = "cmdlang.pest"] // Path relative to src/
pub struct CommandParser;

/// Parse a full command (one or more statements).
pub fn parse_command(source: &str) -> Result<Program, ParseError> {
    let mut pairs = CommandParser::parse(Rule::command, source)?;
    let command = pairs.next().ok_or_else(|| ParseError::Invalid {
        construct: "command",
        message: "parser produced no command".to_string(),
        span: None,
    })?;
    build_program(command)
}

/// Parse a single expression (useful for tests and tooling).
pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
    let mut pairs = CommandParser::parse(Rule::single_expression, source)?;
    let wrapper = pairs.next().ok_or_else(|| ParseError::Invalid {
        construct: "expression",
        message: "parser produced no expression".to_string(),
        span: None,
    })?;
    let expr_pair = wrapper
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::expression)
        .ok_or_else(|| ParseError::Invalid {
            construct: "expression",
            message: "no expression found".to_string(),
            span: None,
        })?;
    build_expression(expr_pair)
}
