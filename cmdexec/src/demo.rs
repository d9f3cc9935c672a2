//! Demo tools for the command-line executor.

use crate::provider::{ToolOutput, ToolProvider};
use crate::signal::Signal;
use cmdlang::{CallArgs, RuntimeError, Value};
use itertools::Itertools;
use std::time::Duration;

fn join_values(values: &[Value]) -> String {
    values.iter().join(" ")
}

/// `echo`, `warn`, `fail` and `store` (sync) plus `sleep` (async).
pub fn demo_provider() -> ToolProvider {
    ToolProvider::new("demo")
        .with_tool("echo", |args: CallArgs| {
            let text = join_values(&args.positional);
            Ok(ToolOutput::new(Value::String(text.clone())).with_signal(Signal::ok(text)))
        })
        .with_tool("warn", |args: CallArgs| {
            let text = join_values(&args.positional);
            Ok(ToolOutput::signal(Signal::warning(text)))
        })
        .with_tool("fail", |args: CallArgs| {
            let text = join_values(&args.positional);
            Ok(ToolOutput::signal(Signal::error(text)))
        })
        .with_tool("store", |args: CallArgs| {
            let name = args
                .require("store", 0, "name")?
                .as_str()
                .ok_or_else(|| RuntimeError::InvalidArgument("store() name must be a str".into()))?
                .to_string();
            let value = args.require("store", 1, "value")?.clone();
            let signal = Signal::ok(format!("stored {}", name))
                .with_varnames([name.clone()])
                .with_response(value.clone());
            Ok(ToolOutput::new(Value::None)
                .with_signal(signal)
                .with_update(name, value))
        })
        .with_async_tool("sleep", |args: CallArgs| async move {
            let ms = args
                .get(0, "ms")
                .and_then(Value::as_integer)
                .unwrap_or(0)
                .max(0);
            tokio::time::sleep(Duration::from_millis(ms as u64)).await;
            Ok::<_, RuntimeError>(ToolOutput::signal(Signal::ok(format!("slept {} ms", ms))))
        })
}
