//! Runtime-registered functions bound to JSON arguments

use serde_json::{json, Value};
use trybatch::adapter::{DynFunction, FunctionRegistry, Kind, Signature, Slot};
use trybatch::batch::BatchExecutor;
use trybatch::TryError;

fn build_registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();

    registry.register(DynFunction::new(
        "upper",
        Signature::new(vec![Kind::Value], vec![Kind::Value, Kind::Error]),
        |args| match args.into_iter().next() {
            Some(Slot::Value(Value::String(s))) => vec![Slot::Value(json!(s.to_uppercase())), Slot::ok()],
            _ => vec![Slot::Value(Value::Null), Slot::err(anyhow::anyhow!("expected a string"))],
        },
    ));

    registry.register(DynFunction::new(
        "log_error",
        Signature::new(vec![Kind::Error], vec![]),
        |args| {
            if let Some(Slot::Error(Some(error))) = args.into_iter().next() {
                eprintln!("❌ {error}");
            }
            vec![]
        },
    ));

    registry
}

#[tokio::main]
async fn main() -> Result<(), TryError> {
    let registry = build_registry();
    println!("Registered: {:?}", registry.list());

    let operations = vec![
        registry.wrap("upper", vec![json!("hello")]),
        registry.wrap("upper", vec![json!(7)]),
        registry.wrap("upper", vec![]),
        registry.wrap("lower", vec![json!("missing")]),
    ];

    let values = BatchExecutor::new()
        .execute(registry.resolve("log_error"), operations)
        .await
        .into_result()?;

    println!("✅ values: {values:?}");
    Ok(())
}
