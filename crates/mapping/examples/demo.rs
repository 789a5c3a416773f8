use mapping::{compile, EvalConfig};
use serde_json::json;

fn main() {
    let program = compile(
        r#"{
            "transaction_id": data.object.charge,
            "reason": data.object.reason,
            "currency": $uppercase(data.object.currency),
            "amount": data.object.amount / 100,
            "provider": "stripe"
        }"#,
    )
    .expect("mapping compiles");

    let payload = json!({
        "type": "charge.dispute.created",
        "data": {"object": {
            "charge": "ch_3MmlLrLkdIwHu7ix0snN0B15",
            "reason": "fraudulent",
            "currency": "usd",
            "amount": 2599
        }}
    });

    let record = program
        .evaluate(&payload, &EvalConfig::default())
        .expect("evaluation succeeds");
    println!("{}", serde_json::to_string_pretty(&record).expect("serializable"));
}
