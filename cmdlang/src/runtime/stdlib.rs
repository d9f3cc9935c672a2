//! Prelude builtins
//!
//! Optional helpers a context can be seeded with before commands run:
//! - Conversions: `str`, `int`, `float`, `bool`
//! - Sequences: `len`, `min`, `max`, `sum`
//! - Numbers: `abs`, `round`
//!
//! All of them are sync callables. Installing never overwrites a name the
//! context already binds, so provider tools win over builtins.

use super::context::Context;
use super::error::{RuntimeError, RuntimeResult};
use super::operators;
use super::values::{CallArgs, Function, Value};
use crate::ast::{BinaryOp, CompareOp};
use std::cmp::Ordering;

type Builtin = fn(CallArgs) -> RuntimeResult<Value>;

pub struct Prelude;

impl Prelude {
    const BUILTINS: &'static [(&'static str, Builtin)] = &[
        ("len", Self::len),
        ("str", Self::str),
        ("int", Self::int),
        ("float", Self::float),
        ("bool", Self::bool),
        ("abs", Self::abs),
        ("min", Self::min),
        ("max", Self::max),
        ("round", Self::round),
        ("sum", Self::sum),
    ];

    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::BUILTINS.iter().map(|(name, _)| *name)
    }

    /// Installs every builtin the context does not already bind and returns
    /// the names that were installed.
    pub fn install(context: &mut Context) -> Vec<String> {
        let mut installed = Vec::new();
        for (name, func) in Self::BUILTINS {
            if context.contains(name) {
                continue;
            }
            context.define_function(Function::native(*name, *func));
            installed.push(name.to_string());
        }
        installed
    }

    fn len(args: CallArgs) -> RuntimeResult<Value> {
        args.expect_at_most("len", 1)?;
        let len = match args.require("len", 0, "obj")? {
            Value::String(s) => s.chars().count(),
            Value::List(items) => items.len(),
            Value::Map(map) => map.len(),
            other => {
                return Err(RuntimeError::type_error(
                    "sized object",
                    other.type_name(),
                    "len",
                ))
            }
        };
        i64::try_from(len)
            .map(Value::Integer)
            .map_err(|_| RuntimeError::Overflow("len".to_string()))
    }

    fn str(args: CallArgs) -> RuntimeResult<Value> {
        args.expect_at_most("str", 1)?;
        Ok(Value::String(
            args.get(0, "object")
                .map(|value| value.to_string())
                .unwrap_or_default(),
        ))
    }

    fn int(args: CallArgs) -> RuntimeResult<Value> {
        args.expect_at_most("int", 1)?;
        match args.get(0, "x") {
            None => Ok(Value::Integer(0)),
            Some(Value::Integer(i)) => Ok(Value::Integer(*i)),
            Some(Value::Boolean(b)) => Ok(Value::Integer(i64::from(*b))),
            Some(Value::Float(f)) => {
                if !f.is_finite() {
                    return Err(RuntimeError::InvalidArgument(format!(
                        "cannot convert float {} to integer",
                        Value::Float(*f)
                    )));
                }
                let truncated = f.trunc();
                if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                    return Err(RuntimeError::Overflow("int".to_string()));
                }
                Ok(Value::Integer(truncated as i64))
            }
            Some(Value::String(s)) => s.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
                RuntimeError::InvalidArgument(format!(
                    "invalid literal for int() with base 10: {}",
                    Value::String(s.clone()).repr()
                ))
            }),
            Some(other) => Err(RuntimeError::type_error(
                "str or number",
                other.type_name(),
                "int",
            )),
        }
    }

    fn float(args: CallArgs) -> RuntimeResult<Value> {
        args.expect_at_most("float", 1)?;
        match args.get(0, "x") {
            None => Ok(Value::Float(0.0)),
            Some(Value::String(s)) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                RuntimeError::InvalidArgument(format!(
                    "could not convert string to float: {}",
                    Value::String(s.clone()).repr()
                ))
            }),
            Some(other) => other.as_number().map(Value::Float).ok_or_else(|| {
                RuntimeError::type_error("str or number", other.type_name(), "float")
            }),
        }
    }

    fn bool(args: CallArgs) -> RuntimeResult<Value> {
        args.expect_at_most("bool", 1)?;
        Ok(Value::Boolean(
            args.get(0, "x").map(Value::is_truthy).unwrap_or(false),
        ))
    }

    fn abs(args: CallArgs) -> RuntimeResult<Value> {
        args.expect_at_most("abs", 1)?;
        match args.require("abs", 0, "x")? {
            Value::Integer(i) => i
                .checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| RuntimeError::Overflow("abs".to_string())),
            Value::Boolean(b) => Ok(Value::Integer(i64::from(*b))),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            other => Err(RuntimeError::type_error(
                "int or float",
                other.type_name(),
                "abs",
            )),
        }
    }

    fn min(args: CallArgs) -> RuntimeResult<Value> {
        Self::extremum("min", CompareOp::Lt, args)
    }

    fn max(args: CallArgs) -> RuntimeResult<Value> {
        Self::extremum("max", CompareOp::Gt, args)
    }

    /// `min(a, b, ...)` or `min(iterable)`; the first of equal candidates wins.
    fn extremum(name: &str, better: CompareOp, args: CallArgs) -> RuntimeResult<Value> {
        if !args.keyword.is_empty() {
            return Err(RuntimeError::InvalidArgument(format!(
                "{}() takes no keyword arguments",
                name
            )));
        }
        let candidates = match args.positional.as_slice() {
            [Value::List(items)] => items.clone(),
            [single] => {
                return Err(RuntimeError::type_error(
                    "list",
                    single.type_name(),
                    name,
                ))
            }
            many => many.to_vec(),
        };
        let mut iter = candidates.into_iter();
        let mut best = iter.next().ok_or_else(|| {
            RuntimeError::InvalidArgument(format!("{}() arg is an empty sequence", name))
        })?;
        for candidate in iter {
            if operators::compare(better, &candidate, &best)? {
                best = candidate;
            }
        }
        Ok(best)
    }

    fn round(args: CallArgs) -> RuntimeResult<Value> {
        args.expect_at_most("round", 2)?;
        let number = args.require("round", 0, "number")?;
        let ndigits = match args.get(1, "ndigits") {
            None | Some(Value::None) => None,
            Some(value) => Some(value.as_integer().ok_or_else(|| {
                RuntimeError::type_error("int", value.type_name(), "round")
            })?),
        };
        match (number, ndigits) {
            (Value::Integer(_) | Value::Boolean(_), digits) => {
                let n = number.as_integer().unwrap_or_default();
                match digits {
                    Some(digits) if digits < 0 => Self::round_int(n, digits.unsigned_abs()),
                    _ => Ok(Value::Integer(n)),
                }
            }
            (Value::Float(f), None) => {
                let rounded = f.round_ties_even();
                if !rounded.is_finite() {
                    return Err(RuntimeError::InvalidArgument(format!(
                        "cannot convert float {} to integer",
                        Value::Float(*f)
                    )));
                }
                if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
                    return Err(RuntimeError::Overflow("round".to_string()));
                }
                Ok(Value::Integer(rounded as i64))
            }
            (Value::Float(f), Some(digits)) => {
                let exponent = i32::try_from(digits)
                    .map_err(|_| RuntimeError::Overflow("round".to_string()))?;
                let scale = 10f64.powi(exponent);
                Ok(Value::Float((f * scale).round_ties_even() / scale))
            }
            (other, _) => Err(RuntimeError::type_error(
                "int or float",
                other.type_name(),
                "round",
            )),
        }
    }

    /// `round(n, -places)` for ints: nearest multiple of `10**places`, ties to
    /// the even multiple.
    fn round_int(n: i64, places: u64) -> RuntimeResult<Value> {
        // |n| < 10**19, so anything coarser than that rounds to zero.
        if places >= 20 {
            return Ok(Value::Integer(0));
        }
        let unit = 10i128.pow(places as u32);
        let n = i128::from(n);
        let (quotient, remainder) = (n.div_euclid(unit), n.rem_euclid(unit));
        let round_up = match (2 * remainder).cmp(&unit) {
            Ordering::Greater => true,
            Ordering::Equal => quotient % 2 != 0,
            Ordering::Less => false,
        };
        let rounded = (quotient + i128::from(round_up)) * unit;
        i64::try_from(rounded)
            .map(Value::Integer)
            .map_err(|_| RuntimeError::Overflow("round".to_string()))
    }

    fn sum(args: CallArgs) -> RuntimeResult<Value> {
        args.expect_at_most("sum", 2)?;
        let items = match args.require("sum", 0, "iterable")? {
            Value::List(items) => items,
            other => {
                return Err(RuntimeError::type_error("list", other.type_name(), "sum"))
            }
        };
        let start = args.get(1, "start").cloned().unwrap_or(Value::Integer(0));
        items
            .iter()
            .try_fold(start, |acc, item| operators::binary(BinaryOp::Add, &acc, item))
    }
}
