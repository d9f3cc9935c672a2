// Abstract syntax tree for command snippets
//
// The node set is closed: a command can only contain what the evaluator
// knows how to run.

use std::fmt;
use std::ops::Range;

/// Byte range of a node in the command source it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A name together with the source span it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Identifier {
            name: name.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }

    /// Parses the operator part of an arithmetic or augmented-assignment token.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Sub),
            "*" => Some(BinaryOp::Mul),
            "/" => Some(BinaryOp::Div),
            "//" => Some(BinaryOp::FloorDiv),
            "%" => Some(BinaryOp::Mod),
            "**" => Some(BinaryOp::Pow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtE => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtE => ">=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::NotEq),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::LtE),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::GtE),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Positional(Expression),
    Keyword { name: String, value: Expression },
}

impl Argument {
    pub fn value(&self) -> &Expression {
        match self {
            Argument::Positional(value) => value,
            Argument::Keyword { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    /// A free identifier. After rewriting none of these remain.
    Name(Identifier),
    /// `__context['name']`: an explicit slot in the shared context. The span
    /// covers the whole lookup.
    ContextRef(Identifier),
    List(Vec<Expression>),
    Dict(Vec<(Expression, Expression)>),
    Attribute {
        value: Box<Expression>,
        attr: String,
    },
    Subscript {
        value: Box<Expression>,
        index: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Argument>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    BoolOp {
        op: BoolOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Python-style chained comparison: `a < b <= c`.
    Compare {
        left: Box<Expression>,
        comparisons: Vec<(CompareOp, Expression)>,
    },
    Await(Box<Expression>),
}

impl Expression {
    /// The leftmost node of an access/call chain (`a` in `a.b[0](x)`).
    pub fn chain_head(&self) -> &Expression {
        match self {
            Expression::Attribute { value, .. } | Expression::Subscript { value, .. } => {
                value.chain_head()
            }
            Expression::Call { callee, .. } => callee.chain_head(),
            other => other,
        }
    }

    /// Short noun used in diagnostics ("cannot assign to call").
    pub fn describe(&self) -> &'static str {
        match self {
            Expression::Literal(_) => "literal",
            Expression::Name(_) => "name",
            Expression::ContextRef(_) => "context slot",
            Expression::List(_) => "list display",
            Expression::Dict(_) => "dict display",
            Expression::Attribute { .. } => "attribute",
            Expression::Subscript { .. } => "subscript",
            Expression::Call { .. } => "function call",
            Expression::Unary { .. } | Expression::Binary { .. } => "expression",
            Expression::BoolOp { .. } => "boolean expression",
            Expression::Compare { .. } => "comparison",
            Expression::Await(_) => "await expression",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `a = b = value`; targets are assigned left to right.
    Assign {
        targets: Vec<Expression>,
        value: Expression,
    },
    AugAssign {
        target: Expression,
        op: BinaryOp,
        value: Expression,
    },
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Program { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
