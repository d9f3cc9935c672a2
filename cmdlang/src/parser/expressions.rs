use super::common::{build_identifier, build_literal, first_inner, span_of};
use super::errors::ParseError;
use super::Rule;
use crate::ast::{
    Argument, BinaryOp, BoolOp, CompareOp, Expression, Identifier, Literal, Span, UnaryOp,
};
use crate::CONTEXT_PARAM;
use pest::iterators::{Pair, Pairs};

pub(super) fn build_expression(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    let span = span_of(&pair);
    match pair.as_rule() {
        Rule::expression | Rule::positional_argument | Rule::target => {
            build_expression(first_inner(pair, "expression")?)
        }
        Rule::or_test => build_bool_chain(pair, BoolOp::Or),
        Rule::and_test => build_bool_chain(pair, BoolOp::And),
        Rule::not_test => build_not(pair),
        Rule::comparison => build_comparison(pair),
        Rule::arith_expr | Rule::term => build_binary_chain(pair),
        Rule::factor => build_factor(pair),
        Rule::power => build_power(pair),
        Rule::await_expr => build_await(pair),
        Rule::primary => build_primary(pair),
        Rule::integer | Rule::float | Rule::string | Rule::boolean | Rule::none => {
            Ok(Expression::Literal(build_literal(pair)?))
        }
        Rule::identifier => Ok(Expression::Name(build_identifier(pair))),
        Rule::list => Ok(Expression::List(
            pair.into_inner()
                .map(build_expression)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Rule::dict => build_dict(pair),
        other => Err(ParseError::invalid(
            "expression",
            format!("unexpected rule {:?}", other),
            span,
        )),
    }
}

fn build_bool_chain(pair: Pair<Rule>, op: BoolOp) -> Result<Expression, ParseError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let mut left = next_operand(&mut inner, span)?;
    while let Some(_op_token) = inner.next() {
        let right = next_operand(&mut inner, span)?;
        left = Expression::BoolOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn build_not(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let first = inner
        .next()
        .ok_or_else(|| ParseError::invalid("not expression", "missing operand", span))?;
    if first.as_rule() == Rule::not_op {
        let operand = next_operand(&mut inner, span)?;
        Ok(Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        })
    } else {
        build_expression(first)
    }
}

fn build_comparison(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let left = next_operand(&mut inner, span)?;
    let mut comparisons = Vec::new();
    while let Some(op_token) = inner.next() {
        let op = CompareOp::from_symbol(op_token.as_str()).ok_or_else(|| {
            ParseError::invalid("comparison", format!("unknown operator '{}'", op_token.as_str()), span)
        })?;
        comparisons.push((op, next_operand(&mut inner, span)?));
    }
    if comparisons.is_empty() {
        Ok(left)
    } else {
        Ok(Expression::Compare {
            left: Box::new(left),
            comparisons,
        })
    }
}

fn build_binary_chain(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let mut left = next_operand(&mut inner, span)?;
    while let Some(op_token) = inner.next() {
        let op = binary_op(&op_token)?;
        let right = next_operand(&mut inner, span)?;
        left = Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn build_factor(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let first = inner
        .next()
        .ok_or_else(|| ParseError::invalid("factor", "missing operand", span))?;
    if first.as_rule() != Rule::unary_op {
        return build_expression(first);
    }
    let op = match first.as_str() {
        "-" => UnaryOp::Neg,
        _ => UnaryOp::Pos,
    };
    let operand = next_operand(&mut inner, span)?;
    // Fold `-5` straight into a literal so negative numbers round-trip as literals.
    match (op, operand) {
        (UnaryOp::Neg, Expression::Literal(Literal::Integer(n))) if n != i64::MIN => {
            Ok(Expression::Literal(Literal::Integer(-n)))
        }
        (UnaryOp::Neg, Expression::Literal(Literal::Float(f))) => {
            Ok(Expression::Literal(Literal::Float(-f)))
        }
        (op, operand) => Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
        }),
    }
}

fn build_power(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let base = next_operand(&mut inner, span)?;
    match inner.next() {
        None => Ok(base),
        Some(_pow_token) => {
            let exponent = next_operand(&mut inner, span)?;
            Ok(Expression::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            })
        }
    }
}

fn build_await(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let first = inner
        .next()
        .ok_or_else(|| ParseError::invalid("await expression", "missing operand", span))?;
    if first.as_rule() == Rule::await_kw {
        let operand = next_operand(&mut inner, span)?;
        Ok(Expression::Await(Box::new(operand)))
    } else {
        build_expression(first)
    }
}

/// Builds an atom followed by its call/attribute/subscript trailers.
///
/// `__context['name']` is lowered to [`Expression::ContextRef`] here so later
/// passes never see the context parameter as an ordinary name.
fn build_primary(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner().peekable();
    let atom = inner
        .next()
        .ok_or_else(|| ParseError::invalid("primary expression", "missing atom", span))?;
    let atom_span = span_of(&atom);

    let mut expr = build_expression(atom)?;

    if matches!(&expr, Expression::Name(id) if id.name == CONTEXT_PARAM) {
        let is_slot = inner
            .peek()
            .map(|next| next.as_rule() == Rule::subscript)
            .unwrap_or(false);
        if is_slot {
            if let Some(subscript) = inner.next() {
                let subscript_span = span_of(&subscript);
                let index = build_expression(first_inner(subscript, "subscript")?)?;
                expr = match index {
                    Expression::Literal(Literal::String(name)) => Expression::ContextRef(
                        Identifier::new(name, Span::new(atom_span.start, subscript_span.end)),
                    ),
                    other => Expression::Subscript {
                        value: Box::new(expr),
                        index: Box::new(other),
                    },
                };
            }
        }
    }

    for trailer in inner {
        expr = apply_trailer(expr, trailer)?;
    }
    Ok(expr)
}

fn apply_trailer(expr: Expression, trailer: Pair<Rule>) -> Result<Expression, ParseError> {
    let span = span_of(&trailer);
    match trailer.as_rule() {
        Rule::call => {
            let args = trailer
                .into_inner()
                .map(build_argument)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expression::Call {
                callee: Box::new(expr),
                args,
            })
        }
        Rule::attribute => {
            let attr = first_inner(trailer, "attribute")?;
            Ok(Expression::Attribute {
                value: Box::new(expr),
                attr: attr.as_str().to_string(),
            })
        }
        Rule::subscript => {
            let index = build_expression(first_inner(trailer, "subscript")?)?;
            Ok(Expression::Subscript {
                value: Box::new(expr),
                index: Box::new(index),
            })
        }
        other => Err(ParseError::invalid(
            "trailer",
            format!("unexpected rule {:?}", other),
            span,
        )),
    }
}

fn build_argument(pair: Pair<Rule>) -> Result<Argument, ParseError> {
    let span = span_of(&pair);
    match pair.as_rule() {
        Rule::keyword_argument => {
            let mut inner = pair.into_inner();
            let name = inner
                .next()
                .ok_or_else(|| ParseError::invalid("keyword argument", "missing name", span))?;
            let value = next_operand(&mut inner, span)?;
            Ok(Argument::Keyword {
                name: name.as_str().to_string(),
                value,
            })
        }
        _ => Ok(Argument::Positional(build_expression(pair)?)),
    }
}

fn build_dict(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    let mut entries = Vec::new();
    for entry in pair.into_inner() {
        let span = span_of(&entry);
        let mut inner = entry.into_inner();
        let key = next_operand(&mut inner, span)?;
        let value = next_operand(&mut inner, span)?;
        entries.push((key, value));
    }
    Ok(Expression::Dict(entries))
}

fn next_operand(inner: &mut Pairs<Rule>, span: Span) -> Result<Expression, ParseError> {
    let pair = inner
        .next()
        .ok_or_else(|| ParseError::invalid("expression", "missing operand", span))?;
    build_expression(pair)
}

fn binary_op(token: &Pair<Rule>) -> Result<BinaryOp, ParseError> {
    BinaryOp::from_symbol(token.as_str()).ok_or_else(|| {
        ParseError::invalid(
            "operator",
            format!("unknown operator '{}'", token.as_str()),
            span_of(token),
        )
    })
}
