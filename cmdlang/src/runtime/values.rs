// Runtime values

use super::error::{RuntimeError, RuntimeResult};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Function(Function),
    /// Result of calling an async function; drives to completion on `await`.
    Coroutine(Coroutine),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Function(_) | Value::Coroutine(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Function(_) => "function",
            Value::Coroutine(_) => "coroutine",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Capability tag of a callable value, `None` for plain data.
    pub fn call_kind(&self) -> Option<CallKind> {
        match self {
            Value::Function(function) => Some(function.kind()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of a value; booleans count as 0/1.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// `repr()`-style rendering: strings are quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => quote(s),
            other => other.to_string(),
        }
    }

    /// JSON form. Callables and coroutines become descriptive strings and
    /// non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::None => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Function(_) | Value::Coroutine(_) => serde_json::Value::String(self.to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

/// `str()`-style rendering.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Boolean(true) => write!(f, "True"),
            Value::Boolean(false) => write!(f, "False"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", format_float(*fl)),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", quote(key), value.repr())?;
                }
                write!(f, "}}")
            }
            Value::Function(function) => write!(f, "<function {}>", function.name()),
            Value::Coroutine(coroutine) => write!(f, "<coroutine {}>", coroutine.name()),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn quote(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\t', "\\t");
    format!("'{}'", escaped)
}

/// Whether calling a function returns its result or a coroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Sync,
    Async,
}

/// Evaluated arguments of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: IndexMap<String, Value>,
}

impl CallArgs {
    pub fn new(positional: Vec<Value>) -> Self {
        CallArgs {
            positional,
            keyword: IndexMap::new(),
        }
    }

    pub fn with_keyword(mut self, name: impl Into<String>, value: Value) -> Self {
        self.keyword.insert(name.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Argument passed by keyword `name`, or else at position `index`.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.keyword
            .get(name)
            .or_else(|| self.positional.get(index))
    }

    pub fn require(&self, function: &str, index: usize, name: &str) -> RuntimeResult<&Value> {
        self.get(index, name)
            .ok_or_else(|| RuntimeError::MissingArgument {
                function: function.to_string(),
                name: name.to_string(),
            })
    }

    pub fn expect_at_most(&self, function: &str, max: usize) -> RuntimeResult<()> {
        if self.len() > max {
            return Err(RuntimeError::ArityMismatch {
                function: function.to_string(),
                expected: format!("at most {}", max),
                actual: self.len(),
            });
        }
        Ok(())
    }
}

pub type NativeFn = Arc<dyn Fn(CallArgs) -> RuntimeResult<Value> + Send + Sync>;
pub type AsyncNativeFn =
    Arc<dyn Fn(CallArgs) -> BoxFuture<'static, RuntimeResult<Value>> + Send + Sync>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub func: NativeFn,
}

#[derive(Clone)]
pub struct AsyncNativeFunction {
    pub name: String,
    pub func: AsyncNativeFn,
}

#[derive(Clone)]
pub enum Function {
    Native(NativeFunction),
    AsyncNative(AsyncNativeFunction),
}

impl Function {
    pub fn native<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(CallArgs) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        Function::Native(NativeFunction {
            name: name.into(),
            func: Arc::new(func),
        })
    }

    pub fn async_native<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RuntimeResult<Value>> + Send + 'static,
    {
        Function::AsyncNative(AsyncNativeFunction {
            name: name.into(),
            func: Arc::new(move |args| Box::pin(func(args))),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Function::Native(f) => &f.name,
            Function::AsyncNative(f) => &f.name,
        }
    }

    pub fn kind(&self) -> CallKind {
        match self {
            Function::Native(_) => CallKind::Sync,
            Function::AsyncNative(_) => CallKind::Async,
        }
    }

    /// Sync functions run to completion here; async ones produce a coroutine
    /// that has not started yet.
    pub fn call(&self, args: CallArgs) -> RuntimeResult<Value> {
        match self {
            Function::Native(f) => (f.func)(args),
            Function::AsyncNative(f) => Ok(Value::Coroutine(Coroutine::new(
                f.name.clone(),
                (f.func)(args),
            ))),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native(native) => f
                .debug_struct("NativeFunction")
                .field("name", &native.name)
                .finish(),
            Function::AsyncNative(native) => f
                .debug_struct("AsyncNativeFunction")
                .field("name", &native.name)
                .finish(),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Native(a), Function::Native(b)) => {
                a.name == b.name && Arc::ptr_eq(&a.func, &b.func)
            }
            (Function::AsyncNative(a), Function::AsyncNative(b)) => {
                a.name == b.name && Arc::ptr_eq(&a.func, &b.func)
            }
            _ => false,
        }
    }
}

/// A pending async call. Clones share the same future, which can be taken once.
#[derive(Clone)]
pub struct Coroutine {
    name: String,
    future: Arc<Mutex<Option<BoxFuture<'static, RuntimeResult<Value>>>>>,
}

impl Coroutine {
    pub fn new(name: impl Into<String>, future: BoxFuture<'static, RuntimeResult<Value>>) -> Self {
        Coroutine {
            name: name.into(),
            future: Arc::new(Mutex::new(Some(future))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_consumed(&self) -> bool {
        self.future
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Takes the future out; `None` once it has already been awaited.
    pub fn take(&self) -> Option<BoxFuture<'static, RuntimeResult<Value>>> {
        self.future
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine").field("name", &self.name).finish()
    }
}

impl PartialEq for Coroutine {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.future, &other.future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_matches_python_str() {
        let list = Value::List(vec![
            Value::Integer(1),
            Value::Float(2.0),
            Value::String("a'b".into()),
            Value::None,
            Value::Boolean(true),
        ]);
        assert_eq!(list.to_string(), r"[1, 2.0, 'a\'b', None, True]");
        assert_eq!(Value::String("plain".into()).to_string(), "plain");
        assert_eq!(Value::Float(0.1).to_string(), "0.1");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
    }

    #[test]
    fn json_conversion_keeps_structure_and_order() {
        let json = json!({"z": 1, "a": [true, null, 2.5, "s"]});
        let value = Value::from(json.clone());
        let Value::Map(map) = &value else {
            panic!("expected map");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn functions_serialize_as_descriptions() {
        let f = Value::Function(Function::native("echo", |_| Ok(Value::None)));
        assert_eq!(f.to_json(), json!("<function echo>"));
        assert_eq!(f.call_kind(), Some(CallKind::Sync));
        assert_eq!(Value::Integer(1).call_kind(), None);
    }

    #[test]
    fn call_args_prefer_keywords() {
        let args = CallArgs::new(vec![Value::Integer(1)]).with_keyword("b", Value::Integer(2));
        assert_eq!(args.get(0, "a"), Some(&Value::Integer(1)));
        assert_eq!(args.get(1, "b"), Some(&Value::Integer(2)));
        assert!(matches!(
            args.require("f", 2, "c"),
            Err(RuntimeError::MissingArgument { .. })
        ));
    }

    #[test]
    fn coroutine_future_can_be_taken_once() {
        let f = Function::async_native("later", |_| async { Ok(Value::Integer(7)) });
        let Ok(Value::Coroutine(coroutine)) = f.call(CallArgs::default()) else {
            panic!("expected coroutine");
        };
        let shared = coroutine.clone();
        assert!(coroutine.take().is_some());
        assert!(shared.is_consumed());
        assert!(shared.take().is_none());
    }
}
