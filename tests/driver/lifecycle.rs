use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use loadtask::{Driver, PayloadSpec, ProcessorRegistry, Script, SimulatedEngine, TaskError};

use super::engines::{
    stamping, CapturingEngine, FailingProcessor, PanickingEngine, RejectingEngine,
};

fn script(value: serde_json::Value) -> Script {
    Script::from_value(value).expect("valid script")
}

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).expect("write fixture");
}

#[tokio::test]
async fn test_single_payload_reaches_engine() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "p.csv", "a,b\n1,2\n3,4");
    let engine = Arc::new(CapturingEngine::default());
    let driver = Driver::new(engine.clone()).with_working_dir(dir.path());
    let s = script(json!({
        "config": { "target": "http://localhost", "payload": { "path": "p.csv", "options": {} } },
        "scenarios": [{ "flow": [{ "get": { "url": "/" } }] }]
    }));
    let before = s.clone();

    driver.exec_load("1700000000000", &s).await.unwrap();

    let captured = engine.last();
    let Some(PayloadSpec::Single(descriptor)) = captured.payload else {
        panic!("expected a single payload descriptor");
    };
    assert_eq!(
        descriptor.data.unwrap(),
        vec![vec!["a", "b"], vec!["1", "2"], vec!["3", "4"]]
    );
    assert_eq!(captured.options.invocation_id, "1700000000000");
    assert_eq!(captured.script.script, before);
    assert_eq!(s, before);
}

#[tokio::test]
async fn test_header_row_consumed_with_columns() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "p.csv", "a,b\n1,2\n3,4");
    let engine = Arc::new(CapturingEngine::default());
    let driver = Driver::new(engine.clone()).with_working_dir(dir.path());
    let s = script(json!({
        "config": { "payload": { "path": "p.csv", "options": { "columns": true } } }
    }));

    driver.exec_load("1", &s).await.unwrap();

    let payload = engine.last().payload.unwrap();
    assert_eq!(
        payload.descriptors()[0].data.as_ref().unwrap(),
        &vec![vec!["1", "2"], vec!["3", "4"]]
    );
}

#[tokio::test]
async fn test_multiple_payloads_keep_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "first.csv", "x\n");
    write(dir.path(), "second.csv", "y\nz\n");
    let engine = Arc::new(CapturingEngine::default());
    let driver = Driver::new(engine.clone()).with_working_dir(dir.path());
    let s = script(json!({
        "config": { "payload": [
            { "path": "second.csv", "fields": ["b"] },
            { "path": "first.csv", "fields": ["a"] }
        ]}
    }));
    let before = s.clone();

    driver.exec_load("1", &s).await.unwrap();

    let payload = engine.last().payload.unwrap();
    let descriptors = payload.descriptors();
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0].path, "second.csv");
    assert_eq!(descriptors[0].rest["fields"], json!(["b"]));
    assert_eq!(descriptors[0].data.as_ref().unwrap(), &vec![vec!["y"], vec!["z"]]);
    assert_eq!(descriptors[1].data.as_ref().unwrap(), &vec![vec!["x"]]);
    assert_eq!(s, before);
}

#[tokio::test]
async fn test_unsupported_payload_shape_degrades_to_none() {
    let engine = Arc::new(CapturingEngine::default());
    let driver = Driver::new(engine.clone()).with_working_dir("/");
    let s = script(json!({ "config": { "payload": "users.csv" } }));

    let report = driver.exec_load("1", &s).await.unwrap();

    assert!(report.latencies().is_some());
    assert!(engine.last().payload.is_none());
}

#[tokio::test]
async fn test_simulation_reads_nothing() {
    let engine = Arc::new(CapturingEngine::default());
    let driver = Driver::new(engine.clone()).with_working_dir("/nonexistent");
    let s = script(json!({
        "config": { "processor": "./hooks.js", "payload": { "path": "missing.csv" } },
        "_simulation": true,
        "_trace": true
    }));

    let report = driver.exec_load("1", &s).await.unwrap();

    assert_eq!(report.get("errors"), Some(&json!(0)));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_rejected_script_names_genesis_and_invocation() {
    let driver = Driver::new(Arc::new(RejectingEngine)).with_working_dir("/");
    let s = script(json!({ "_genesis": "nightly-schedule" }));

    let err = driver.exec_load("1700000000123", &s).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("nightly-schedule"), "{message}");
    assert!(message.contains("1700000000123"), "{message}");
    assert!(message.contains("scenario 'checkout' has no flow"), "{message}");
    assert!(matches!(err.root(), TaskError::Engine(_)));
}

#[tokio::test]
async fn test_engine_panic_is_contained() {
    let driver = Driver::new(Arc::new(PanickingEngine)).with_working_dir("/");
    let s = script(json!({ "_genesis": "g-1" }));

    let err = driver.exec_load("42", &s).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("g-1"));
    assert!(message.contains("42"));
    assert!(message.contains("engine state corrupted"));
}

#[tokio::test]
async fn test_missing_payload_file_fails_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(CapturingEngine::default());
    let driver = Driver::new(engine.clone()).with_working_dir(dir.path());
    let s = script(json!({ "config": { "payload": { "path": "absent.csv" } }, "_genesis": "g" }));

    let err = driver.exec_load("7", &s).await.unwrap_err();

    assert!(matches!(err, TaskError::Invocation { .. }));
    assert!(matches!(err.root(), TaskError::PayloadRead { .. }));
    assert!(err.to_string().contains("caused by"));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_unknown_processor_fails_before_payload() {
    let engine = Arc::new(CapturingEngine::default());
    let driver = Driver::new(engine.clone()).with_working_dir("/");
    let s = script(json!({
        "config": { "processor": "./hooks.js", "payload": { "path": "absent.csv" } }
    }));

    let err = driver.exec_load("1", &s).await.unwrap_err();

    assert!(matches!(err.root(), TaskError::ConfigResolution { .. }));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_processor_resolved_and_passed_to_engine() {
    let engine = Arc::new(CapturingEngine::default());
    let mut registry = ProcessorRegistry::new();
    registry.register("hooks", stamping());
    let driver = Driver::new(engine.clone())
        .with_processors(registry)
        .with_working_dir("/srv/task");
    let s = script(json!({ "config": { "processor": "./hooks.js" } }));

    driver.exec_load("1", &s).await.unwrap();

    let captured = engine.last();
    let processor = captured.script.processor.expect("processor resolved");
    assert_eq!(processor.path, Path::new("/srv/task/./hooks.js"));
    assert_eq!(captured.script.script.config.processor, Some(json!("./hooks.js")));
}

#[tokio::test]
async fn test_simulated_engine_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "users.csv", "name\nada\ngrace\n");
    let processor = stamping();
    let mut registry = ProcessorRegistry::new();
    registry.register("hooks", processor.clone());
    let driver = Driver::new(Arc::new(SimulatedEngine::default()))
        .with_processors(registry)
        .with_working_dir(dir.path());
    let s = script(json!({
        "config": {
            "target": "http://localhost:8080",
            "processor": "hooks.js",
            "phases": [
                { "name": "warm up", "duration": 10, "arrivalRate": 1 },
                { "pause": 2 },
                { "name": "peak", "duration": 5, "arrivalRate": 4 }
            ],
            "payload": { "path": "users.csv", "options": { "columns": true } }
        },
        "_trace": true,
        "_genesis": "manual"
    }));

    let report = driver.exec_load("1", &s).await.unwrap();

    assert_eq!(report.get("scenariosCreated"), Some(&json!(30)));
    assert_eq!(report.get("phases"), Some(&json!(3)));
    assert_eq!(report.get("payloadRows"), Some(&json!(2)));
    assert_eq!(report.latencies(), Some(&json!([])));
    assert_eq!(*processor.phases.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_processor_failure_surfaces_as_engine_error() {
    let mut registry = ProcessorRegistry::new();
    registry.register("hooks", Arc::new(FailingProcessor));
    let driver = Driver::new(Arc::new(SimulatedEngine::default()))
        .with_processors(registry)
        .with_working_dir("/");
    let s = script(json!({
        "config": { "processor": "hooks.js", "phases": [{ "duration": 1, "arrivalRate": 1 }] },
        "_genesis": "g"
    }));

    let err = driver.exec_load("5", &s).await.unwrap_err();

    assert!(matches!(err.root(), TaskError::Engine(_)));
    assert!(err.to_string().contains("explode is not implemented"));
}

#[tokio::test]
async fn test_empty_processor_runs_without_one() {
    let engine = Arc::new(CapturingEngine::default());
    let driver = Driver::new(engine.clone()).with_working_dir("/");
    let s = script(json!({ "config": { "processor": "" } }));

    driver.exec_load("1", &s).await.unwrap();

    let captured = engine.last();
    assert!(captured.script.processor.is_none());
    assert_eq!(captured.script.script.config.processor, Some(json!("")));
}

#[tokio::test]
async fn test_numeric_simulation_flag_short_circuits() {
    let engine = Arc::new(CapturingEngine::default());
    let driver = Driver::new(engine.clone()).with_working_dir("/nonexistent");
    let s = script(json!({
        "config": { "payload": { "path": "missing.csv" } },
        "_simulation": 1,
        "_trace": "yes"
    }));

    let report = driver.exec_load("1", &s).await.unwrap();

    assert_eq!(report.get("errors"), Some(&json!(0)));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_zero_payload_runs_without_payload() {
    let engine = Arc::new(CapturingEngine::default());
    let driver = Driver::new(engine.clone()).with_working_dir("/");
    let s = script(json!({ "config": { "payload": 0 } }));

    driver.exec_load("1", &s).await.unwrap();

    assert!(engine.last().payload.is_none());
}
