use normalizer::{
    ErrorKind, EvalConfig, Pipeline, PipelineOutcome, RegistryBuilder, SchemaValidator, Violation,
};
use serde_json::json;
use std::time::{Duration, Instant};

const PASSTHROUGH: &str = r#"{
    "transaction_id": id,
    "reason": reason,
    "currency": currency,
    "amount": amount,
    "provider": "passthrough"
}"#;

fn pipeline_with(source: &str, eval_config: EvalConfig) -> Pipeline {
    let mut builder = RegistryBuilder::new();
    builder
        .register_source("custom", source)
        .expect("mapping compiles");
    Pipeline::new(builder.build(), SchemaValidator::default(), eval_config)
}

#[test]
fn string_amount_is_rejected_with_type_violation() {
    let pipeline = pipeline_with(PASSTHROUGH, EvalConfig::default());
    let outcome = pipeline.process(
        "custom",
        &json!({"id": "t1", "reason": "fraud", "currency": "USD", "amount": "25.99"}),
    );
    assert_eq!(
        outcome,
        PipelineOutcome::Rejected(vec![Violation::new("/amount", "must be number")])
    );
}

#[test]
fn violations_are_collected_exhaustively() {
    let pipeline = pipeline_with(PASSTHROUGH, EvalConfig::default());
    let outcome = pipeline.process(
        "custom",
        &json!({"id": 42, "currency": "usd", "amount": true}),
    );
    let violations = outcome.violations().expect("rejected");
    assert_eq!(
        violations,
        [
            Violation::new("", "must have required property 'reason'"),
            Violation::new("/transaction_id", "must be string"),
            Violation::new("/currency", "must match pattern \"^[A-Z]{3}$\""),
            Violation::new("/amount", "must be number"),
        ]
    );
}

#[test]
fn non_object_mapping_result_is_rejected() {
    let pipeline = pipeline_with("[1, 2, 3]", EvalConfig::default());
    let outcome = pipeline.process("custom", &json!({}));
    assert_eq!(
        outcome,
        PipelineOutcome::Rejected(vec![Violation::new("", "must be object")])
    );

    let pipeline = pipeline_with("missing.path", EvalConfig::default());
    assert!(pipeline.process("custom", &json!({})).is_rejected());
}

#[test]
fn evaluation_timeout_is_a_failure_not_a_hang() {
    let pipeline = pipeline_with(PASSTHROUGH, EvalConfig::with_timeout_ms(0));
    let outcome = pipeline.process("custom", &json!({"id": "t1"}));
    let failure = outcome.failure().expect("failed");
    assert_eq!(failure.kind, ErrorKind::Timeout);
    assert_eq!(failure.message, "payload transformation timed out");
}

#[test]
fn deadline_stops_a_slow_mapping_near_its_budget() {
    let pipeline = pipeline_with(
        r#"{"transaction_id": id, "reason": items.code, "currency": items.code.iso,
            "amount": 1, "provider": "custom"}"#,
        EvalConfig::with_timeout_ms(10),
    );
    let payload = json!({"id": "t1", "items": vec![json!(0); 2_000_000]});

    let started = Instant::now();
    let outcome = pipeline.process("custom", &payload);
    let elapsed = started.elapsed();

    let failure = outcome.failure().expect("failed");
    assert_eq!(failure.kind, ErrorKind::Timeout);
    assert!(elapsed < Duration::from_millis(500), "overran budget: {elapsed:?}");
}

#[test]
fn large_payload_completes_within_budget() {
    let pipeline = pipeline_with(
        r#"{"transaction_id": $string(items[-1].id), "reason": "bulk", "currency": "USD",
            "amount": $number(items.id[0]), "provider": "custom"}"#,
        EvalConfig::default(),
    );
    let items: Vec<_> = (0..10_000).map(|i| json!({"id": i})).collect();
    let outcome = pipeline.process("custom", &json!({"items": items}));
    let record = outcome.record().expect("succeeded");
    assert_eq!(record.transaction_id(), Some("9999"));
    assert_eq!(record.amount(), Some(0.0));
}

#[test]
fn runtime_faults_never_leak_payload_values() {
    let pipeline = pipeline_with(r#"{"amount": amount * 2}"#, EvalConfig::default());
    let outcome = pipeline.process("custom", &json!({"amount": "4111-1111-1111-1111"}));
    let failure = outcome.failure().expect("failed");
    assert_eq!(failure.kind, ErrorKind::Evaluation);
    assert!(!failure.message.contains("4111"));
    assert!(!failure.to_string().contains("4111"));
}

#[test]
fn unknown_provider_is_case_sensitive() {
    let pipeline = pipeline_with(PASSTHROUGH, EvalConfig::default());
    let outcome = pipeline.process("Custom", &json!({}));
    assert_eq!(
        outcome.failure().map(|f| f.kind),
        Some(ErrorKind::UnknownProvider)
    );
}

#[test]
fn compile_errors_surface_at_registration() {
    let mut builder = RegistryBuilder::new();
    let err = builder
        .register_source("stripe", r#"{"amount": $exec("id")}"#)
        .unwrap_err();
    assert!(err.to_string().contains("stripe"));
    assert!(err.to_string().contains("unknown function"));
}
