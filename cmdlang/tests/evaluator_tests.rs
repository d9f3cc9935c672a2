use cmdlang::runtime::{Evaluation, RuntimeError};
use cmdlang::{rewrite, CallArgs, Context, Function, Unit, Value};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

async fn run(command: &str, context: &Context) -> Evaluation {
    let rewritten = rewrite(command, context).expect("rewrite");
    let unit = Unit::synthesize(rewritten).expect("synthesize");
    unit.run(context).await
}

fn tool_context() -> Context {
    let mut context = Context::with_prelude();
    context.define_native("area", |args: CallArgs| {
        let width = args.require("area", 0, "width")?.clone();
        let height = args.require("area", 1, "height")?.clone();
        cmdlang::runtime::operators::binary(cmdlang::ast::BinaryOp::Mul, &width, &height)
    });
    context.define_function(Function::async_native("double", |args: CallArgs| async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        let n = args.require("double", 0, "n")?.as_integer().unwrap_or(0);
        Ok::<_, RuntimeError>(Value::Integer(n * 2))
    }));
    context
}

#[tokio::test]
async fn assignments_are_visible_to_later_statements() {
    let context = Context::new();
    let evaluation = run("x = 1 + 1\ny = x * 2", &context).await;
    assert!(evaluation.is_ok());
    assert_eq!(evaluation.bindings.get("x"), Some(&Value::Integer(2)));
    assert_eq!(evaluation.bindings.get("y"), Some(&Value::Integer(4)));
    // The evaluator never writes to the context itself.
    assert!(context.is_empty());
}

#[tokio::test]
async fn reads_values_from_the_context() {
    let context = Context::from_json(json!({"y": 3, "name": "box"})).unwrap();
    let evaluation = run("z = y ** 2; label = name + '-' + str(z)", &context).await;
    assert_eq!(evaluation.result, Ok(Value::None));
    assert_eq!(evaluation.bindings.get("z"), Some(&Value::Integer(9)));
    assert_eq!(
        evaluation.bindings.get("label"),
        Some(&Value::String("box-9".into()))
    );
}

#[tokio::test]
async fn expression_statement_yields_its_value() {
    let context = tool_context();
    let evaluation = run("area(3, height=4)", &context).await;
    assert_eq!(evaluation.result, Ok(Value::Integer(12)));
    assert!(evaluation.bindings.is_empty());
}

#[tokio::test]
async fn undefined_names_fail_but_keep_earlier_bindings() {
    let context = Context::new();
    let evaluation = run("a = 1\nb = missing\nc = 3", &context).await;
    assert_eq!(
        evaluation.result,
        Err(RuntimeError::UndefinedName("missing".into()))
    );
    assert_eq!(evaluation.bindings.keys().collect::<Vec<_>>(), vec!["a"]);
}

#[tokio::test]
async fn async_tools_are_awaited_after_rewriting() {
    let context = tool_context();
    let evaluation = run("r = double(21) + double(n=1)", &context).await;
    assert_eq!(evaluation.result, Ok(Value::None));
    assert_eq!(evaluation.bindings.get("r"), Some(&Value::Integer(44)));
}

#[tokio::test]
async fn coroutines_can_only_be_awaited_once() {
    let context = tool_context();
    let unit = Unit::compile("c = __context['double'](2)\nr = await c\ns = await c").unwrap();
    let evaluation = unit.run(&context).await;
    assert_eq!(evaluation.bindings.get("r"), Some(&Value::Integer(4)));
    assert_eq!(
        evaluation.result,
        Err(RuntimeError::CoroutineAlreadyAwaited("double".into()))
    );
}

#[tokio::test]
async fn awaiting_plain_values_is_an_error() {
    let context = Context::new();
    let evaluation = run("r = await 3", &context).await;
    assert_eq!(evaluation.result, Err(RuntimeError::NotAwaitable("int".into())));
}

#[tokio::test]
async fn nested_assignment_rebinds_the_root() {
    let context = Context::from_json(json!({
        "canvas": {"objects": [{"left": 10, "top": 0}]}
    }))
    .unwrap();
    let evaluation = run(
        "canvas.objects[0].left += 5\ncanvas['objects'][-1].angle = 90",
        &context,
    )
    .await;
    assert!(evaluation.is_ok(), "{:?}", evaluation.result);
    assert_eq!(
        evaluation.bindings.get("canvas").map(Value::to_json),
        Some(json!({"objects": [{"left": 15, "top": 0, "angle": 90}]}))
    );
    // Original context value untouched until the caller merges.
    assert_eq!(
        context.get("canvas").map(Value::to_json),
        Some(json!({"objects": [{"left": 10, "top": 0}]}))
    );
}

#[tokio::test]
async fn boolean_operators_return_operands_and_short_circuit() {
    let context = Context::new();
    let evaluation = run(
        "a = 0 or 'default'\nb = None and missing\nc = 1 < 2 < 3\nd = 3 < 2 < missing",
        &context,
    )
    .await;
    assert!(evaluation.is_ok(), "{:?}", evaluation.result);
    assert_eq!(evaluation.bindings.get("a"), Some(&Value::String("default".into())));
    assert_eq!(evaluation.bindings.get("b"), Some(&Value::None));
    assert_eq!(evaluation.bindings.get("c"), Some(&Value::Boolean(true)));
    assert_eq!(evaluation.bindings.get("d"), Some(&Value::Boolean(false)));
}

#[tokio::test]
async fn chained_assignment_binds_every_target() {
    let context = Context::new();
    let evaluation = run("a = b = [1, 2]\nb[0] = 9", &context).await;
    assert!(evaluation.is_ok());
    assert_eq!(evaluation.bindings.get("a").map(Value::to_json), Some(json!([1, 2])));
    assert_eq!(evaluation.bindings.get("b").map(Value::to_json), Some(json!([9, 2])));
}

#[tokio::test]
async fn runtime_errors_describe_the_failure() {
    let context = tool_context();
    let cases = [
        ("x = 1 / 0", "Division by zero"),
        ("x = [1][5]", "Index 5 out of bounds for sequence of length 1"),
        ("x = {'a': 1}['b']", "Key not found: 'b'"),
        ("x = 1 + 'a'", "Type error in +: expected compatible operands, got int and str"),
        ("x = 5()", "'int' object is not callable"),
        ("x = area(1)", "area() missing required argument: 'height'"),
    ];
    for (command, message) in cases {
        let evaluation = run(command, &context).await;
        match evaluation.result {
            Err(err) => assert_eq!(err.to_string(), message, "command: {}", command),
            Ok(value) => panic!("{} should fail, got {:?}", command, value),
        }
    }
}

#[tokio::test]
async fn prelude_helpers_are_callable() {
    let context = tool_context();
    let evaluation = run(
        "n = len([1, 2, 3])\nm = max(n, 2)\ns = sum([0.5, 1])\nr = round(2.675, 2)",
        &context,
    )
    .await;
    assert!(evaluation.is_ok(), "{:?}", evaluation.result);
    assert_eq!(evaluation.bindings.get("n"), Some(&Value::Integer(3)));
    assert_eq!(evaluation.bindings.get("m"), Some(&Value::Integer(3)));
    assert_eq!(evaluation.bindings.get("s"), Some(&Value::Float(1.5)));
    assert!(matches!(evaluation.bindings.get("r"), Some(Value::Float(_))));
}
