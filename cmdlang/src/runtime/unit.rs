// Compiled form of one command

use super::context::Context;
use super::evaluator::{Evaluation, Evaluator};
use crate::ast::{Argument, Expression, Program, Statement};
use crate::parser::{parse_command, ParseError};
use crate::rewriter::RewrittenCommand;
use crate::CONTEXT_PARAM;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("cannot assign to {0}")]
    InvalidTarget(&'static str),

    #[error("'__context' can only be used as __context['name']")]
    BareContextParameter,
}

/// An executable unit: conceptually `async (context) -> bindings`.
///
/// The body is the rewritten program; the bindings it hands back are every
/// name it assigned, ready to be merged into the context.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    source: String,
    program: Program,
}

impl Unit {
    /// Builds a unit from a rewritten command.
    pub fn synthesize(command: RewrittenCommand) -> Result<Unit, CompileError> {
        validate(&command.program)?;
        Ok(Unit {
            source: command.source,
            program: command.program,
        })
    }

    /// Parses and validates source as-is, without rewriting.
    pub fn compile(source: &str) -> Result<Unit, CompileError> {
        let program = parse_command(source)?;
        validate(&program)?;
        Ok(Unit {
            source: source.to_string(),
            program,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub async fn run(&self, context: &Context) -> Evaluation {
        Evaluator::new(context).run(&self.program).await
    }
}

fn validate(program: &Program) -> Result<(), CompileError> {
    for statement in &program.statements {
        match statement {
            Statement::Assign { targets, value } => {
                for target in targets {
                    validate_target(target)?;
                }
                validate_expr(value)?;
            }
            Statement::AugAssign { target, value, .. } => {
                validate_target(target)?;
                validate_expr(value)?;
            }
            Statement::Expression(expr) => validate_expr(expr)?,
        }
    }
    Ok(())
}

fn validate_target(target: &Expression) -> Result<(), CompileError> {
    match target {
        Expression::Name(_)
        | Expression::ContextRef(_)
        | Expression::Attribute { .. }
        | Expression::Subscript { .. } => validate_expr(target),
        other => Err(CompileError::InvalidTarget(other.describe())),
    }
}

fn validate_expr(expr: &Expression) -> Result<(), CompileError> {
    match expr {
        Expression::Name(id) if id.name == CONTEXT_PARAM => Err(CompileError::BareContextParameter),
        Expression::Name(_) | Expression::ContextRef(_) | Expression::Literal(_) => Ok(()),
        Expression::List(items) => items.iter().try_for_each(validate_expr),
        Expression::Dict(entries) => entries.iter().try_for_each(|(key, value)| {
            validate_expr(key)?;
            validate_expr(value)
        }),
        Expression::Attribute { value, .. } => validate_expr(value),
        Expression::Subscript { value, index } => {
            validate_expr(value)?;
            validate_expr(index)
        }
        Expression::Call { callee, args } => {
            validate_expr(callee)?;
            args.iter().map(Argument::value).try_for_each(validate_expr)
        }
        Expression::Unary { operand, .. } => validate_expr(operand),
        Expression::Binary { left, right, .. } | Expression::BoolOp { left, right, .. } => {
            validate_expr(left)?;
            validate_expr(right)
        }
        Expression::Compare { left, comparisons } => {
            validate_expr(left)?;
            comparisons
                .iter()
                .try_for_each(|(_, right)| validate_expr(right))
        }
        Expression::Await(inner) => validate_expr(inner),
    }
}
