use super::common::{first_inner, span_of};
use super::errors::ParseError;
use super::expressions::build_expression;
use super::Rule;
use crate::ast::{BinaryOp, Program, Statement};
use pest::iterators::Pair;

pub(super) fn build_program(command: Pair<Rule>) -> Result<Program, ParseError> {
    let statements = command
        .into_inner()
        .filter(|pair| pair.as_rule() != Rule::EOI)
        .map(build_statement)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Program::new(statements))
}

fn build_statement(pair: Pair<Rule>) -> Result<Statement, ParseError> {
    let span = span_of(&pair);
    match pair.as_rule() {
        Rule::assignment => {
            let mut parts = pair
                .into_inner()
                .map(build_expression)
                .collect::<Result<Vec<_>, _>>()?;
            let value = parts
                .pop()
                .ok_or_else(|| ParseError::invalid("assignment", "missing value", span))?;
            if parts.is_empty() {
                return Err(ParseError::invalid("assignment", "missing target", span));
            }
            Ok(Statement::Assign {
                targets: parts,
                value,
            })
        }
        Rule::aug_assignment => {
            let mut inner = pair.into_inner();
            let (target, op_token, value) = match (inner.next(), inner.next(), inner.next()) {
                (Some(target), Some(op), Some(value)) => (target, op, value),
                _ => {
                    return Err(ParseError::invalid(
                        "augmented assignment",
                        "expected target, operator and value",
                        span,
                    ))
                }
            };
            let symbol = op_token.as_str().trim_end_matches('=');
            let op = BinaryOp::from_symbol(symbol).ok_or_else(|| {
                ParseError::invalid(
                    "augmented assignment",
                    format!("unknown operator '{}'", op_token.as_str()),
                    span,
                )
            })?;
            Ok(Statement::AugAssign {
                target: build_expression(target)?,
                op,
                value: build_expression(value)?,
            })
        }
        Rule::expression_statement => Ok(Statement::Expression(build_expression(first_inner(
            pair,
            "expression statement",
        )?)?)),
        other => Err(ParseError::invalid(
            "statement",
            format!("unexpected rule {:?}", other),
            span,
        )),
    }
}
