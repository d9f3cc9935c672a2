// Async tree-walking evaluator for command programs

use super::context::{Bindings, Context};
use super::error::{RuntimeError, RuntimeResult};
use super::operators;
use super::values::{CallArgs, Value};
use crate::ast::{Argument, BoolOp, Expression, Identifier, Literal, Program, Statement};
use futures::future::BoxFuture;

/// Outcome of running one program.
///
/// `bindings` holds every name the program bound before it finished or
/// failed; callers merge them into the context either way, the same way a
/// failing command has already written whatever it assigned before the error.
#[derive(Debug)]
pub struct Evaluation {
    pub bindings: Bindings,
    /// Value of the last statement, or the first runtime failure.
    pub result: RuntimeResult<Value>,
}

impl Evaluation {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// One step of an assignment path such as `obj.items[0]`.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Attribute(String),
    Index(Value),
}

/// Evaluates a program against a read-only view of the context. Assignments
/// go to a private frame that shadows the context for the rest of the run.
pub struct Evaluator<'c> {
    context: &'c Context,
    frame: Bindings,
}

impl<'c> Evaluator<'c> {
    pub fn new(context: &'c Context) -> Self {
        Evaluator {
            context,
            frame: Bindings::new(),
        }
    }

    pub async fn run(mut self, program: &Program) -> Evaluation {
        let mut result = Ok(Value::None);
        for statement in &program.statements {
            match self.exec_statement(statement).await {
                Ok(value) => result = Ok(value),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        Evaluation {
            bindings: self.frame,
            result,
        }
    }

    async fn exec_statement(&mut self, statement: &Statement) -> RuntimeResult<Value> {
        match statement {
            Statement::Expression(expr) => self.eval_expr(expr).await,
            Statement::Assign { targets, value } => {
                let value = self.eval_expr(value).await?;
                for target in targets {
                    self.assign(target, value.clone()).await?;
                }
                Ok(Value::None)
            }
            Statement::AugAssign { target, op, value } => {
                let current = self.eval_expr(target).await?;
                let operand = self.eval_expr(value).await?;
                let updated = operators::binary(*op, &current, &operand)?;
                self.assign(target, updated).await?;
                Ok(Value::None)
            }
        }
    }

    fn load(&self, id: &Identifier) -> RuntimeResult<Value> {
        match self.frame.get(&id.name) {
            Some(value) => Ok(value.clone()),
            None => self.context.lookup(&id.name),
        }
    }

    fn eval_expr<'e>(&'e mut self, expr: &'e Expression) -> BoxFuture<'e, RuntimeResult<Value>> {
        Box::pin(async move {
            match expr {
                Expression::Literal(literal) => Ok(literal_value(literal)),
                Expression::Name(id) | Expression::ContextRef(id) => self.load(id),
                Expression::List(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval_expr(item).await?);
                    }
                    Ok(Value::List(values))
                }
                Expression::Dict(entries) => {
                    let mut map = Bindings::with_capacity(entries.len());
                    for (key, value) in entries {
                        let key = match self.eval_expr(key).await? {
                            Value::String(key) => key,
                            other => {
                                return Err(RuntimeError::type_error(
                                    "str",
                                    other.type_name(),
                                    "dict key",
                                ))
                            }
                        };
                        let value = self.eval_expr(value).await?;
                        map.insert(key, value);
                    }
                    Ok(Value::Map(map))
                }
                Expression::Attribute { value, attr } => {
                    let value = self.eval_expr(value).await?;
                    get_attribute(&value, attr).cloned()
                }
                Expression::Subscript { value, index } => {
                    let value = self.eval_expr(value).await?;
                    let index = self.eval_expr(index).await?;
                    get_index(&value, &index)
                }
                Expression::Call { callee, args } => {
                    let function = self.eval_expr(callee).await?;
                    let args = self.eval_arguments(args).await?;
                    match function {
                        Value::Function(function) => function.call(args),
                        other => Err(RuntimeError::NotCallable(other.type_name().to_string())),
                    }
                }
                Expression::Unary { op, operand } => {
                    let operand = self.eval_expr(operand).await?;
                    operators::unary(*op, &operand)
                }
                Expression::Binary { op, left, right } => {
                    let left = self.eval_expr(left).await?;
                    let right = self.eval_expr(right).await?;
                    operators::binary(*op, &left, &right)
                }
                Expression::BoolOp { op, left, right } => {
                    let left = self.eval_expr(left).await?;
                    match (op, left.is_truthy()) {
                        (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                        _ => self.eval_expr(right).await,
                    }
                }
                Expression::Compare { left, comparisons } => {
                    let mut left = self.eval_expr(left).await?;
                    for (op, right) in comparisons {
                        let right = self.eval_expr(right).await?;
                        if !operators::compare(*op, &left, &right)? {
                            return Ok(Value::Boolean(false));
                        }
                        left = right;
                    }
                    Ok(Value::Boolean(true))
                }
                Expression::Await(inner) => match self.eval_expr(inner).await? {
                    Value::Coroutine(coroutine) => match coroutine.take() {
                        Some(future) => future.await,
                        None => Err(RuntimeError::CoroutineAlreadyAwaited(
                            coroutine.name().to_string(),
                        )),
                    },
                    other => Err(RuntimeError::NotAwaitable(other.type_name().to_string())),
                },
            }
        })
    }

    async fn eval_arguments(&mut self, args: &[Argument]) -> RuntimeResult<CallArgs> {
        let mut call_args = CallArgs::default();
        for arg in args {
            match arg {
                Argument::Positional(expr) => call_args.positional.push(self.eval_expr(expr).await?),
                Argument::Keyword { name, value } => {
                    let value = self.eval_expr(value).await?;
                    if call_args.keyword.insert(name.clone(), value).is_some() {
                        return Err(RuntimeError::InvalidArgument(format!(
                            "keyword argument repeated: {}",
                            name
                        )));
                    }
                }
            }
        }
        Ok(call_args)
    }

    async fn assign(&mut self, target: &Expression, value: Value) -> RuntimeResult<()> {
        match target {
            Expression::Name(id) | Expression::ContextRef(id) => {
                self.frame.insert(id.name.clone(), value);
                Ok(())
            }
            Expression::Attribute { .. } | Expression::Subscript { .. } => {
                let (root, segments) = self.target_path(target).await?;
                let mut current = self.load(root)?;
                set_path(&mut current, &segments, value)?;
                self.frame.insert(root.name.clone(), current);
                Ok(())
            }
            other => Err(RuntimeError::Generic(format!(
                "cannot assign to {}",
                other.describe()
            ))),
        }
    }

    /// Splits `a.b[i].c` into its root name and the evaluated path below it.
    /// Index expressions are evaluated left to right.
    async fn target_path<'e>(
        &mut self,
        target: &'e Expression,
    ) -> RuntimeResult<(&'e Identifier, Vec<PathSegment>)> {
        let mut chain = Vec::new();
        let mut node = target;
        let root = loop {
            match node {
                Expression::Attribute { value, .. } | Expression::Subscript { value, .. } => {
                    chain.push(node);
                    node = value;
                }
                Expression::Name(id) | Expression::ContextRef(id) => break id,
                other => {
                    return Err(RuntimeError::Generic(format!(
                        "cannot assign through {}",
                        other.describe()
                    )))
                }
            }
        };

        let mut segments = Vec::with_capacity(chain.len());
        for node in chain.into_iter().rev() {
            match node {
                Expression::Attribute { attr, .. } => {
                    segments.push(PathSegment::Attribute(attr.clone()))
                }
                Expression::Subscript { index, .. } => {
                    segments.push(PathSegment::Index(self.eval_expr(index).await?))
                }
                _ => {}
            }
        }
        Ok((root, segments))
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::None => Value::None,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
    }
}

/// Dicts double as records: `obj.name` reads the `name` key.
fn get_attribute<'v>(value: &'v Value, attr: &str) -> RuntimeResult<&'v Value> {
    match value {
        Value::Map(map) => map.get(attr).ok_or_else(|| attribute_error(value, attr)),
        _ => Err(attribute_error(value, attr)),
    }
}

fn attribute_error(value: &Value, attr: &str) -> RuntimeError {
    RuntimeError::AttributeNotFound {
        type_name: value.type_name().to_string(),
        attribute: attr.to_string(),
    }
}

fn get_index(value: &Value, index: &Value) -> RuntimeResult<Value> {
    match value {
        Value::List(items) => {
            let position = resolve_index(index, items.len())?;
            Ok(items[position].clone())
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let position = resolve_index(index, chars.len())?;
            Ok(Value::String(chars[position].to_string()))
        }
        Value::Map(map) => {
            let key = map_key(index)?;
            map.get(key)
                .cloned()
                .ok_or_else(|| RuntimeError::KeyNotFound {
                    key: key.to_string(),
                })
        }
        other => Err(RuntimeError::type_error(
            "list, str or dict",
            other.type_name(),
            "subscript",
        )),
    }
}

/// Python-style index: negatives count from the end.
fn resolve_index(index: &Value, length: usize) -> RuntimeResult<usize> {
    let raw = index
        .as_integer()
        .ok_or_else(|| RuntimeError::type_error("int", index.type_name(), "index"))?;
    let out_of_bounds = || RuntimeError::IndexOutOfBounds { index: raw, length };
    let len = i64::try_from(length).map_err(|_| out_of_bounds())?;
    let position = if raw < 0 { raw + len } else { raw };
    if position < 0 || position >= len {
        return Err(out_of_bounds());
    }
    usize::try_from(position).map_err(|_| out_of_bounds())
}

fn map_key(index: &Value) -> RuntimeResult<&str> {
    index
        .as_str()
        .ok_or_else(|| RuntimeError::type_error("str", index.type_name(), "dict key"))
}

fn child_mut<'v>(value: &'v mut Value, segment: &PathSegment) -> RuntimeResult<&'v mut Value> {
    let type_name = value.type_name();
    match (value, segment) {
        (Value::Map(map), PathSegment::Attribute(attr)) => {
            map.get_mut(attr.as_str())
                .ok_or_else(|| RuntimeError::AttributeNotFound {
                    type_name: type_name.to_string(),
                    attribute: attr.clone(),
                })
        }
        (Value::Map(map), PathSegment::Index(index)) => {
            let key = map_key(index)?;
            map.get_mut(key).ok_or_else(|| RuntimeError::KeyNotFound {
                key: key.to_string(),
            })
        }
        (Value::List(items), PathSegment::Index(index)) => {
            let position = resolve_index(index, items.len())?;
            Ok(&mut items[position])
        }
        (_, PathSegment::Attribute(attr)) => Err(RuntimeError::AttributeNotFound {
            type_name: type_name.to_string(),
            attribute: attr.clone(),
        }),
        (_, PathSegment::Index(_)) => Err(RuntimeError::type_error(
            "list or dict",
            type_name,
            "subscript",
        )),
    }
}

/// Writes `new_value` at `segments` below `target`, creating the final dict
/// key if needed.
pub fn set_path(target: &mut Value, segments: &[PathSegment], new_value: Value) -> RuntimeResult<()> {
    let Some((last, parents)) = segments.split_last() else {
        *target = new_value;
        return Ok(());
    };
    let mut current = target;
    for segment in parents {
        current = child_mut(current, segment)?;
    }
    let type_name = current.type_name();
    match (current, last) {
        (Value::Map(map), PathSegment::Attribute(attr)) => {
            map.insert(attr.clone(), new_value);
            Ok(())
        }
        (Value::Map(map), PathSegment::Index(index)) => {
            let key = map_key(index)?.to_string();
            map.insert(key, new_value);
            Ok(())
        }
        (Value::List(items), PathSegment::Index(index)) => {
            let position = resolve_index(index, items.len())?;
            items[position] = new_value;
            Ok(())
        }
        (_, PathSegment::Attribute(attr)) => Err(RuntimeError::AttributeNotFound {
            type_name: type_name.to_string(),
            attribute: attr.clone(),
        }),
        (_, PathSegment::Index(_)) => Err(RuntimeError::type_error(
            "list or dict",
            type_name,
            "item assignment",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_path_updates_nested_values() {
        let mut value = Value::from(json!({"objects": [{"x": 1}, {"x": 2}]}));
        set_path(
            &mut value,
            &[
                PathSegment::Attribute("objects".into()),
                PathSegment::Index(Value::Integer(-1)),
                PathSegment::Attribute("x".into()),
            ],
            Value::Integer(5),
        )
        .unwrap();
        assert_eq!(value.to_json(), json!({"objects": [{"x": 1}, {"x": 5}]}));
    }

    #[test]
    fn set_path_rejects_out_of_range_and_scalars() {
        let mut value = Value::from(json!([1]));
        assert_eq!(
            set_path(&mut value, &[PathSegment::Index(Value::Integer(3))], Value::None),
            Err(RuntimeError::IndexOutOfBounds { index: 3, length: 1 })
        );
        let mut scalar = Value::Integer(1);
        assert!(set_path(&mut scalar, &[PathSegment::Attribute("a".into())], Value::None).is_err());
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let list = Value::from(json!([1, 2, 3]));
        assert_eq!(get_index(&list, &Value::Integer(-1)), Ok(Value::Integer(3)));
        assert!(get_index(&list, &Value::Integer(-4)).is_err());
    }
}
