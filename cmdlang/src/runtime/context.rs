// Shared execution context for a sequence of commands

use super::error::{RuntimeError, RuntimeResult};
use super::stdlib::Prelude;
use super::values::{CallArgs, CallKind, Function, Value};
use indexmap::IndexMap;

/// Ordered name -> value map a unit hands back after it ran.
pub type Bindings = IndexMap<String, Value>;

/// The mutable name -> value store every command of an invocation reads from
/// and writes back into. Insertion order is kept so serialized contexts are
/// stable.
#[derive(Debug, Clone, Default)]
pub struct Context {
    bindings: Bindings,
}

impl Context {
    /// Creates a new, empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context with the prelude builtins installed.
    pub fn with_prelude() -> Self {
        let mut context = Self::new();
        Prelude::install(&mut context);
        context
    }

    /// Seeds a context from a JSON object. Anything else is rejected.
    pub fn from_json(json: serde_json::Value) -> RuntimeResult<Self> {
        match Value::from(json) {
            Value::Map(bindings) => Ok(Context { bindings }),
            other => Err(RuntimeError::type_error(
                "JSON object",
                other.type_name(),
                "context seed",
            )),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Like [`Context::get`] but a missing name is an error.
    pub fn lookup(&self, name: &str) -> RuntimeResult<Value> {
        self.bindings
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedName(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Defines a new name or replaces an existing one.
    pub fn define(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.bindings.insert(name.into(), value)
    }

    pub fn define_function(&mut self, function: Function) {
        self.bindings
            .insert(function.name().to_string(), Value::Function(function));
    }

    /// Registers a sync callable under `name`.
    pub fn define_native<F>(&mut self, name: &str, func: F)
    where
        F: Fn(CallArgs) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        self.define_function(Function::native(name, func));
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.shift_remove(name)
    }

    /// Capability tag of the value bound to `name`, if it is callable.
    pub fn call_kind(&self, name: &str) -> Option<CallKind> {
        self.bindings.get(name).and_then(Value::call_kind)
    }

    pub fn is_async_callable(&self, name: &str) -> bool {
        self.call_kind(name) == Some(CallKind::Async)
    }

    /// Copies `bindings` in, returning the merged names in order.
    pub fn merge(&mut self, bindings: Bindings) -> Vec<String> {
        let mut names = Vec::with_capacity(bindings.len());
        for (name, value) in bindings {
            names.push(name.clone());
            self.bindings.insert(name, value);
        }
        names
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// JSON snapshot of the data in the context. Callables and pending
    /// coroutines are left out.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.bindings
                .iter()
                .filter(|(_, value)| !matches!(value, Value::Function(_) | Value::Coroutine(_)))
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_reports_undefined_names() {
        let context = Context::new();
        assert_eq!(
            context.lookup("missing"),
            Err(RuntimeError::UndefinedName("missing".into()))
        );
    }

    #[test]
    fn from_json_requires_an_object() {
        let context = Context::from_json(json!({"x": 1})).unwrap();
        assert_eq!(context.get("x"), Some(&Value::Integer(1)));
        assert!(Context::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn merge_overwrites_and_reports_names() {
        let mut context = Context::new();
        context.define("a", Value::Integer(1));
        let mut bindings = Bindings::new();
        bindings.insert("a".into(), Value::Integer(2));
        bindings.insert("b".into(), Value::Integer(3));
        assert_eq!(context.merge(bindings), vec!["a", "b"]);
        assert_eq!(context.get("a"), Some(&Value::Integer(2)));
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn call_kind_tracks_capability_tags() {
        let mut context = Context::new();
        context.define_native("now", |_| Ok(Value::Integer(0)));
        context.define_function(Function::async_native("fetch", |_| async {
            Ok(Value::None)
        }));
        context.define("data", Value::Integer(1));
        assert_eq!(context.call_kind("now"), Some(CallKind::Sync));
        assert!(context.is_async_callable("fetch"));
        assert!(!context.is_async_callable("data"));
        assert_eq!(context.to_json(), json!({"data": 1}));
    }
}
