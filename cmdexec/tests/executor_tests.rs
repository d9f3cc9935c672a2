use cmdexec::demo::demo_provider;
use cmdexec::{
    execute, ExecError, ExecState, Executor, ExecutorConfig, Provider, Signal, SignalStatus,
};
use cmdlang::{Context, RewriteError, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Hands out a fixed signal per command, in order.
struct ScriptedProvider {
    script: Vec<Option<Signal>>,
    cursor: usize,
    installs: usize,
}

impl ScriptedProvider {
    fn new(script: Vec<Option<Signal>>) -> Self {
        ScriptedProvider {
            script,
            cursor: 0,
            installs: 0,
        }
    }

    fn always_ok(len: usize) -> Self {
        Self::new(vec![Some(Signal::ok("done")); len])
    }
}

impl Provider for ScriptedProvider {
    fn set_context(&mut self, _context: &mut Context) {
        self.installs += 1;
    }

    fn get_signal(&self) -> Option<Signal> {
        self.script.get(self.cursor).cloned().flatten()
    }

    fn clear_signal(&mut self) {
        self.cursor += 1;
    }
}

#[tokio::test]
async fn assignments_flow_into_context() {
    let commands = ["x = 1 + 1", "y = x * 2"];
    let mut context = Context::new();
    let mut provider = ScriptedProvider::always_ok(commands.len());

    let outcome = Executor::default()
        .run(&commands, &mut context, &mut provider)
        .await
        .unwrap();

    assert_eq!(outcome.state, ExecState::Completed);
    assert_eq!(outcome.message.status, SignalStatus::Ok);
    assert_eq!(outcome.message.commands, vec!["x = 1 + 1", "y = x * 2"]);
    assert_eq!(context.get("x"), Some(&Value::Integer(2)));
    assert_eq!(context.get("y"), Some(&Value::Integer(4)));
    assert_eq!(provider.installs, 1);
}

#[tokio::test]
async fn runtime_failure_halts_with_error() {
    let commands = ["a = 1", "b = undefined_name", "c = 3"];
    let mut context = Context::new();
    let mut provider = ScriptedProvider::always_ok(commands.len());

    let outcome = Executor::default()
        .run(&commands, &mut context, &mut provider)
        .await
        .unwrap();

    assert_eq!(outcome.state, ExecState::HaltedError);
    assert_eq!(outcome.message.status, SignalStatus::Error);
    assert_eq!(outcome.message.commands, vec!["a = 1", "b = undefined_name"]);
    assert!(outcome.message.text.contains("undefined_name"));
    assert_eq!(context.get("a"), Some(&Value::Integer(1)));
    assert!(!context.contains("b"));
    assert!(!context.contains("c"));
}

#[tokio::test]
async fn provider_warning_stops_the_sequence() {
    let commands = ["a = 1", "b = 2", "c = 3"];
    let mut context = Context::new();
    let mut provider = ScriptedProvider::new(vec![
        Some(Signal::ok("first")),
        Some(Signal::warning("careful").with_varnames(["b"])),
        Some(Signal::ok("third")),
    ]);

    let outcome = Executor::default()
        .run(&commands, &mut context, &mut provider)
        .await
        .unwrap();

    assert_eq!(outcome.state, ExecState::HaltedWarning);
    assert!(outcome.state.is_halted());
    assert_eq!(outcome.message.commands.len(), 2);
    assert_eq!(outcome.message.status, SignalStatus::Warning);
    assert_eq!(outcome.message.text, "careful");
    assert_eq!(outcome.message.varnames, vec!["b"]);
    assert_eq!(context.get("b"), Some(&Value::Integer(2)));
    assert!(!context.contains("c"));
}

#[tokio::test]
async fn later_commands_read_earlier_bindings() {
    let commands = ["total = 5", "total = total + 1", "label = 'n=' + str(total)"];
    let mut context = Context::with_prelude();
    let mut provider = ScriptedProvider::new(Vec::new());

    let message = execute(&commands, &mut context, &mut provider).await.unwrap();

    assert!(message.is_ok());
    assert_eq!(context.get("total"), Some(&Value::Integer(6)));
    assert_eq!(context.get("label"), Some(&Value::String("n=6".into())));
}

#[tokio::test]
async fn empty_command_list_reports_default_ok() {
    let commands: [&str; 0] = [];
    let mut context = Context::new();
    let mut provider = ScriptedProvider::new(Vec::new());

    let outcome = Executor::default()
        .run(&commands, &mut context, &mut provider)
        .await
        .unwrap();

    assert_eq!(outcome.state, ExecState::Completed);
    assert_eq!(
        serde_json::to_value(&outcome.message).unwrap(),
        json!({"status": "ok", "commands": [], "text": "", "varnames": [], "response": null})
    );
    assert_eq!(provider.installs, 1);
}

#[tokio::test]
async fn missing_signal_keeps_the_previous_one() {
    let commands = ["a = 1", "b = 2"];
    let mut context = Context::new();
    let mut provider = ScriptedProvider::new(vec![Some(Signal::ok("first")), None]);

    let message = execute(&commands, &mut context, &mut provider).await.unwrap();

    assert_eq!(message.text, "first");
    assert_eq!(message.commands.len(), 2);
}

#[tokio::test]
async fn unparsable_command_is_an_exec_error() {
    let commands = ["a = 1", "x = (1"];
    let mut context = Context::new();
    let mut provider = ScriptedProvider::always_ok(commands.len());

    let err = execute(&commands, &mut context, &mut provider)
        .await
        .unwrap_err();

    assert_eq!(err.index(), 1);
    assert!(matches!(
        err,
        ExecError::Rewrite {
            source: RewriteError::Parse(_),
            ..
        }
    ));
    assert_eq!(context.get("a"), Some(&Value::Integer(1)));
}

#[tokio::test]
async fn invalid_assignment_target_is_a_compile_error() {
    let commands = ["1 = x"];
    let mut context = Context::new();
    let mut provider = ScriptedProvider::always_ok(1);

    let err = execute(&commands, &mut context, &mut provider)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Compile { index: 0, .. }));
    assert!(err.to_string().contains("\"1 = x\""));
}

#[tokio::test]
async fn demo_tools_report_signals() {
    let commands = ["echo('hello', 'world')"];
    let mut context = Context::new();
    let mut provider = demo_provider();

    let message = execute(&commands, &mut context, &mut provider).await.unwrap();

    assert!(message.is_ok());
    assert_eq!(message.text, "hello world");
    assert!(provider.get_signal().is_none());
}

#[tokio::test]
async fn async_tools_are_awaited() {
    let commands = ["t = sleep(1)", "echo('after', t)"];
    let mut context = Context::new();
    let mut provider = demo_provider();

    let message = execute(&commands, &mut context, &mut provider).await.unwrap();

    assert!(message.is_ok());
    assert_eq!(context.get("t"), Some(&Value::None));
    assert_eq!(message.text, "after None");
}

#[tokio::test]
async fn mailbox_is_cleared_between_commands() {
    let commands = ["warn_later = 1", "echo('one')", "x = warn_later + 1"];
    let mut context = Context::new();
    let mut provider = demo_provider();

    let message = execute(&commands, &mut context, &mut provider).await.unwrap();

    // the third command calls no tool, so the echo signal stays the last one
    assert_eq!(message.text, "one");
    assert_eq!(message.commands.len(), 3);
    assert!(provider.get_signal().is_none());
    assert_eq!(context.get("x"), Some(&Value::Integer(2)));
}

#[tokio::test]
async fn tool_updates_reach_the_context() {
    let commands = ["store('n', 41)", "m = n + 1"];
    let mut context = Context::new();
    let mut provider = demo_provider();

    let message = execute(&commands, &mut context, &mut provider).await.unwrap();

    assert_eq!(context.get("n"), Some(&Value::Integer(41)));
    assert_eq!(context.get("m"), Some(&Value::Integer(42)));
    assert_eq!(message.text, "stored n");
    assert_eq!(message.varnames, vec!["n"]);
    assert_eq!(message.response, Value::Integer(41));
}

#[tokio::test]
async fn provider_error_signal_halts() {
    let commands = ["fail('disk', 'full')", "x = 1"];
    let mut context = Context::new();
    let mut provider = demo_provider();

    let outcome = Executor::default()
        .run(&commands, &mut context, &mut provider)
        .await
        .unwrap();

    assert_eq!(outcome.state, ExecState::HaltedError);
    assert_eq!(outcome.message.text, "disk full");
    assert_eq!(outcome.message.commands, vec!["fail('disk', 'full')"]);
    assert!(!context.contains("x"));
}

#[tokio::test]
async fn failing_tool_becomes_error_signal() {
    let commands = ["store(1, 2)"];
    let mut context = Context::new();
    let mut provider = demo_provider();

    let message = execute(&commands, &mut context, &mut provider).await.unwrap();

    assert_eq!(message.status, SignalStatus::Error);
    assert!(message.text.contains("name must be a str"));
}

#[tokio::test]
async fn runtime_error_text_replaces_earlier_signal() {
    let commands = ["echo('before')", "y = 1 // 0"];
    let mut context = Context::new();
    let mut provider = demo_provider();

    let message = execute(&commands, &mut context, &mut provider).await.unwrap();

    assert_eq!(message.status, SignalStatus::Error);
    assert_eq!(message.text, "Division by zero");
}

#[tokio::test]
async fn oversized_repetition_becomes_error_signal() {
    let commands = ["a = 1", "x = 'ab' * 10 ** 18", "y = [] * 10 ** 18", "z = 3"];
    let mut context = Context::new();
    let mut provider = ScriptedProvider::always_ok(commands.len());

    let outcome = Executor::default()
        .run(&commands, &mut context, &mut provider)
        .await
        .unwrap();

    assert_eq!(outcome.state, ExecState::HaltedError);
    assert_eq!(outcome.message.commands, vec!["a = 1", "x = 'ab' * 10 ** 18"]);
    assert!(outcome.message.text.contains("longer than"));
    assert!(!context.contains("x"));

    let commands = ["y = [] * 10 ** 18", "y += [0] * 3"];
    let message = execute(&commands, &mut context, &mut provider).await.unwrap();
    assert!(message.is_ok());
    assert_eq!(
        context.get("y"),
        Some(&Value::List(vec![Value::Integer(0); 3]))
    );
}

#[tokio::test]
async fn prelude_round_overflow_halts() {
    let config = ExecutorConfig {
        install_prelude: true,
        ..Default::default()
    };
    let commands = ["n = round(1234, -2)", "m = round(1e300)"];
    let mut context = Context::new();
    let mut provider = ScriptedProvider::new(Vec::new());

    let message = Executor::new(config)
        .execute(&commands, &mut context, &mut provider)
        .await
        .unwrap();

    assert_eq!(message.status, SignalStatus::Error);
    assert_eq!(message.text, "Integer overflow in round");
    assert_eq!(context.get("n"), Some(&Value::Integer(1200)));
    assert!(!context.contains("m"));
}

#[tokio::test]
async fn power_augmented_assignment() {
    let commands = ["x = 2", "x **= 3"];
    let mut context = Context::new();
    let mut provider = ScriptedProvider::new(Vec::new());

    let message = execute(&commands, &mut context, &mut provider).await.unwrap();

    assert!(message.is_ok());
    assert_eq!(context.get("x"), Some(&Value::Integer(8)));
}

#[tokio::test]
async fn prelude_is_installed_on_request() {
    let commands = ["n = len([1, 2, 3])"];

    let mut context = Context::new();
    let mut provider = ScriptedProvider::new(Vec::new());
    let message = execute(&commands, &mut context, &mut provider).await.unwrap();
    assert_eq!(message.status, SignalStatus::Error);
    assert!(message.text.contains("len"));

    let config = ExecutorConfig {
        install_prelude: true,
        ..Default::default()
    };
    let mut context = Context::new();
    let mut provider = ScriptedProvider::new(Vec::new());
    let message = Executor::new(config)
        .execute(&commands, &mut context, &mut provider)
        .await
        .unwrap();
    assert!(message.is_ok());
    assert_eq!(context.get("n"), Some(&Value::Integer(3)));
}

#[tokio::test]
async fn nested_json_context_is_updated_in_place() {
    let commands = ["canvas.width = canvas.width * 10", "canvas['tags'][0] = 'big'"];
    let mut context =
        Context::from_json(json!({"canvas": {"width": 2, "tags": ["small"]}})).unwrap();
    let mut provider = ScriptedProvider::new(Vec::new());

    let message = execute(&commands, &mut context, &mut provider).await.unwrap();

    assert!(message.is_ok());
    assert_eq!(
        context.to_json(),
        json!({"canvas": {"width": 20, "tags": ["big"]}})
    );
}

#[test]
fn exec_state_serializes_kebab_case() {
    assert_eq!(
        serde_json::to_value(ExecState::HaltedWarning).unwrap(),
        json!("halted-warning")
    );
    assert!(!ExecState::Completed.is_halted());
}
