// Operator semantics
//
// Numbers follow Python: bools count as ints, int arithmetic is exact (here
// checked i64), `/` always yields a float, and `//`/`%` round toward negative
// infinity.

use super::error::{RuntimeError, RuntimeResult};
use super::values::Value;
use crate::ast::{BinaryOp, CompareOp, UnaryOp};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Number> {
        match value {
            Value::Integer(i) => Some(Number::Int(*i)),
            Value::Boolean(b) => Some(Number::Int(i64::from(*b))),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> RuntimeResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!operand.is_truthy())),
        UnaryOp::Neg => match Number::of(operand) {
            Some(Number::Int(i)) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| RuntimeError::Overflow("unary -".to_string())),
            Some(Number::Float(f)) => Ok(Value::Float(-f)),
            None => Err(unsupported_operand("unary -", operand)),
        },
        UnaryOp::Pos => match Number::of(operand) {
            Some(Number::Int(i)) => Ok(Value::Integer(i)),
            Some(Number::Float(f)) => Ok(Value::Float(f)),
            None => Err(unsupported_operand("unary +", operand)),
        },
    }
}

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> RuntimeResult<Value> {
    if let (Some(a), Some(b)) = (Number::of(left), Number::of(right)) {
        return arithmetic(op, a, b);
    }
    match (op, left, right) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinaryOp::Mul, Value::String(s), count) | (BinaryOp::Mul, count, Value::String(s))
            if count.as_integer().is_some() =>
        {
            let times = repeat_count(s.len(), count)?;
            Ok(Value::String(s.repeat(times)))
        }
        (BinaryOp::Mul, Value::List(items), count) | (BinaryOp::Mul, count, Value::List(items))
            if count.as_integer().is_some() =>
        {
            let times = repeat_count(items.len(), count)?;
            let mut out = Vec::with_capacity(items.len() * times);
            for _ in 0..times {
                out.extend(items.iter().cloned());
            }
            Ok(Value::List(out))
        }
        _ => Err(RuntimeError::type_error(
            "compatible operands",
            format!("{} and {}", left.type_name(), right.type_name()),
            op.symbol(),
        )),
    }
}

/// Upper bound on the length (bytes for strings, items for lists) a
/// repetition may produce.
pub const MAX_REPEAT_LEN: usize = 1 << 24;

/// How many copies `len * count` makes. Zero when the sequence is empty or the
/// count is not positive.
fn repeat_count(len: usize, count: &Value) -> RuntimeResult<usize> {
    let times = count
        .as_integer()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    if len == 0 || times == 0 {
        return Ok(0);
    }
    match len.checked_mul(times) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(times),
        _ => Err(RuntimeError::SequenceTooLong {
            limit: MAX_REPEAT_LEN,
        }),
    }
}

fn arithmetic(op: BinaryOp, a: Number, b: Number) -> RuntimeResult<Value> {
    let overflow = || RuntimeError::Overflow(op.symbol().to_string());
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match op {
            BinaryOp::Add => x.checked_add(y).map(Value::Integer).ok_or_else(overflow),
            BinaryOp::Sub => x.checked_sub(y).map(Value::Integer).ok_or_else(overflow),
            BinaryOp::Mul => x.checked_mul(y).map(Value::Integer).ok_or_else(overflow),
            BinaryOp::Div => {
                if y == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Ok(Value::Float(x as f64 / y as f64))
            }
            BinaryOp::FloorDiv => {
                if y == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                let q = x.checked_div(y).ok_or_else(overflow)?;
                let r = x.checked_rem(y).ok_or_else(overflow)?;
                Ok(Value::Integer(if r != 0 && ((r < 0) != (y < 0)) {
                    q - 1
                } else {
                    q
                }))
            }
            BinaryOp::Mod => {
                if y == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                let r = x.checked_rem(y).ok_or_else(overflow)?;
                Ok(Value::Integer(if r != 0 && ((r < 0) != (y < 0)) {
                    r + y
                } else {
                    r
                }))
            }
            BinaryOp::Pow => {
                if y < 0 {
                    if x == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    return Ok(Value::Float((x as f64).powf(y as f64)));
                }
                let exp = u32::try_from(y).map_err(|_| overflow())?;
                x.checked_pow(exp).map(Value::Integer).ok_or_else(overflow)
            }
        },
        (a, b) => {
            let (x, y) = (a.as_f64(), b.as_f64());
            match op {
                BinaryOp::Add => Ok(Value::Float(x + y)),
                BinaryOp::Sub => Ok(Value::Float(x - y)),
                BinaryOp::Mul => Ok(Value::Float(x * y)),
                BinaryOp::Div => {
                    if b.is_zero() {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    Ok(Value::Float(x / y))
                }
                BinaryOp::FloorDiv => {
                    if b.is_zero() {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    Ok(Value::Float((x / y).floor()))
                }
                BinaryOp::Mod => {
                    if b.is_zero() {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    let r = x % y;
                    Ok(Value::Float(if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                        r + y
                    } else {
                        r
                    }))
                }
                BinaryOp::Pow => {
                    if x == 0.0 && y < 0.0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    Ok(Value::Float(x.powf(y)))
                }
            }
        }
    }
}

pub fn compare(op: CompareOp, left: &Value, right: &Value) -> RuntimeResult<bool> {
    match op {
        CompareOp::Eq => Ok(values_equal(left, right)),
        CompareOp::NotEq => Ok(!values_equal(left, right)),
        _ => {
            let ordering = order(left, right).ok_or_else(|| {
                RuntimeError::type_error(
                    "comparable operands",
                    format!("{} and {}", left.type_name(), right.type_name()),
                    op.symbol(),
                )
            })?;
            // Unordered floats (NaN) compare false both ways.
            let Some(ordering) = ordering else {
                return Ok(false);
            };
            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::LtE => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

/// `None` when the two values cannot be ordered at all; `Some(None)` for NaN.
fn order(left: &Value, right: &Value) -> Option<Option<Ordering>> {
    if let (Some(a), Some(b)) = (Number::of(left), Number::of(right)) {
        return Some(match (a, b) {
            (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        });
    }
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                if values_equal(x, y) {
                    continue;
                }
                return order(x, y);
            }
            Some(Some(a.len().cmp(&b.len())))
        }
        _ => None,
    }
}

/// Python `==`: numeric across int/float/bool, structural for containers.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (Number::of(left), Number::of(right)) {
        return match (a, b) {
            (Number::Int(x), Number::Int(y)) => x == y,
            (a, b) => a.as_f64() == b.as_f64(),
        };
    }
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).map_or(false, |y| values_equal(x, y)))
        }
        (Value::Function(a), Value::Function(b)) => a == b,
        (Value::Coroutine(a), Value::Coroutine(b)) => a == b,
        _ => false,
    }
}

fn unsupported_operand(operation: &str, operand: &Value) -> RuntimeError {
    RuntimeError::type_error("int or float", operand.type_name(), operation)
}
