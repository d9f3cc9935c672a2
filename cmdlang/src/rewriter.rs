//! Identifier rewriter
//!
//! Turns every free identifier `x` of a command into the explicit context
//! lookup `__context['x']`, and into `await __context['x']` when the context
//! binds `x` to an async callable. The pass works on source text: the command
//! is parsed with byte spans, qualifying names are replaced rightmost-first so
//! earlier spans stay valid, and the result is parsed again until no free
//! identifier is left.
//!
//! Not identifier references: keyword-argument names, attribute names, and
//! the context parameter itself. Bare assignment targets are rewritten but
//! never awaited, and a name that already heads an explicit `await` is not
//! awaited twice.

use crate::ast::{Expression, Identifier, Program, Span, Statement};
use crate::parser::{parse_command, ParseError};
use crate::runtime::Context;
use crate::CONTEXT_PARAM;
use thiserror::Error;

pub const DEFAULT_MAX_PASSES: usize = 8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RewriteError {
    #[error("failed to parse command: {0}")]
    Parse(#[from] ParseError),

    #[error("rewrite pass {pass} left {after} free identifiers (previous pass: {before})")]
    NoProgress {
        pass: usize,
        before: usize,
        after: usize,
    },

    #[error("free identifiers remain after {max_passes} passes")]
    PassLimit { max_passes: usize },
}

/// One free identifier found in a parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub span: Span,
    pub awaited: bool,
}

impl Reference {
    pub fn replacement(&self) -> String {
        if self.awaited {
            format!("await {}['{}']", CONTEXT_PARAM, self.name)
        } else {
            format!("{}['{}']", CONTEXT_PARAM, self.name)
        }
    }
}

/// A command whose free identifiers all resolve through the context.
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenCommand {
    pub original: String,
    pub source: String,
    pub program: Program,
    /// Parse rounds taken, including the final one that found nothing left.
    pub passes: usize,
    pub replacements: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rewriter {
    max_passes: usize,
}

impl Default for Rewriter {
    fn default() -> Self {
        Rewriter {
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl Rewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// At least two rounds are always allowed: one to rewrite, one to confirm.
    pub fn with_max_passes(max_passes: usize) -> Self {
        Rewriter {
            max_passes: max_passes.max(2),
        }
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    pub fn rewrite(&self, command: &str, context: &Context) -> Result<RewrittenCommand, RewriteError> {
        let mut source = command.to_string();
        let mut previous: Option<usize> = None;
        let mut replacements = 0;

        for pass in 1..=self.max_passes {
            let program = parse_command(&source)?;
            let mut references = free_references(&program, context);
            if references.is_empty() {
                return Ok(RewrittenCommand {
                    original: command.to_string(),
                    source,
                    program,
                    passes: pass,
                    replacements,
                });
            }
            if let Some(before) = previous {
                if references.len() >= before {
                    return Err(RewriteError::NoProgress {
                        pass,
                        before,
                        after: references.len(),
                    });
                }
            }
            previous = Some(references.len());

            references.sort_by(|a, b| b.span.start.cmp(&a.span.start));
            for reference in &references {
                source.replace_range(reference.span.range(), &reference.replacement());
            }
            replacements += references.len();
        }

        Err(RewriteError::PassLimit {
            max_passes: self.max_passes,
        })
    }
}

/// Rewrites with the default pass limit.
pub fn rewrite(command: &str, context: &Context) -> Result<RewrittenCommand, RewriteError> {
    Rewriter::default().rewrite(command, context)
}

/// Free identifiers of `program` in source order.
pub fn free_references(program: &Program, context: &Context) -> Vec<Reference> {
    let mut collector = Collector {
        context,
        references: Vec::new(),
    };
    for statement in &program.statements {
        collector.statement(statement);
    }
    collector.references
}

struct Collector<'a> {
    context: &'a Context,
    references: Vec<Reference>,
}

impl Collector<'_> {
    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Assign { targets, value } => {
                for target in targets {
                    self.target(target);
                }
                self.expr(value, false);
            }
            Statement::AugAssign { target, value, .. } => {
                self.target(target);
                self.expr(value, false);
            }
            Statement::Expression(expr) => self.expr(expr, false),
        }
    }

    fn target(&mut self, target: &Expression) {
        // `await` cannot start an assignment target, so the head of a store
        // path is never awaited either.
        self.expr(target, true);
    }

    /// `no_await` is carried down the access chain (callee, attribute base,
    /// subscript base) so it reaches exactly the chain head.
    fn expr(&mut self, expr: &Expression, no_await: bool) {
        match expr {
            Expression::Name(id) => self.push(id, !no_await),
            Expression::Literal(_) | Expression::ContextRef(_) => {}
            Expression::List(items) => {
                for item in items {
                    self.expr(item, false);
                }
            }
            Expression::Dict(entries) => {
                for (key, value) in entries {
                    self.expr(key, false);
                    self.expr(value, false);
                }
            }
            Expression::Attribute { value, .. } => self.expr(value, no_await),
            Expression::Subscript { value, index } => {
                self.expr(value, no_await);
                self.expr(index, false);
            }
            Expression::Call { callee, args } => {
                self.expr(callee, no_await);
                for arg in args {
                    self.expr(arg.value(), false);
                }
            }
            Expression::Unary { operand, .. } => self.expr(operand, false),
            Expression::Binary { left, right, .. } | Expression::BoolOp { left, right, .. } => {
                self.expr(left, false);
                self.expr(right, false);
            }
            Expression::Compare { left, comparisons } => {
                self.expr(left, false);
                for (_, right) in comparisons {
                    self.expr(right, false);
                }
            }
            Expression::Await(inner) => self.expr(inner, true),
        }
    }

    fn push(&mut self, id: &Identifier, may_await: bool) {
        if id.name == CONTEXT_PARAM {
            return;
        }
        self.references.push(Reference {
            name: id.name.clone(),
            span: id.span,
            awaited: may_await && self.context.is_async_callable(&id.name),
        });
    }
}
