// Command language library
// Parser, identifier rewriter and async runtime for agent commands
pub mod ast;
pub mod parser;
pub mod rewriter;
pub mod runtime;

/// Name of the parameter every rewritten command reads its context through.
pub const CONTEXT_PARAM: &str = "__context";

// Re-export the main entry points so callers rarely need the module paths.
pub use ast::{Expression, Program, Statement};
pub use parser::{parse_command, parse_expression, ParseError};
pub use rewriter::{rewrite, RewriteError, RewrittenCommand, Rewriter};
pub use runtime::{
    Bindings, CallArgs, CallKind, CompileError, Context, Evaluation, Function, Prelude,
    RuntimeError, RuntimeResult, Unit, Value,
};
