//! Implicit provider detection for `POST /webhooks`.
//!
//! Checked in order:
//! 1. an explicit `X-Webhook-Provider` header,
//! 2. provider signature headers,
//! 3. the shape of the payload itself.

use axum::http::HeaderMap;
use serde_json::Value;

pub const PROVIDER_HEADER: &str = "x-webhook-provider";

const SIGNATURE_HEADERS: &[(&str, &str)] = &[
    ("stripe-signature", "stripe"),
    ("paypal-transmission-id", "paypal"),
];

/// Returns the provider key for a request, if one can be inferred.
///
/// The header value is taken verbatim; whether it names a registered
/// provider is the pipeline's concern.
pub fn detect_provider(headers: &HeaderMap, payload: &Value) -> Option<String> {
    if let Some(explicit) = headers
        .get(PROVIDER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(explicit.to_string());
    }

    SIGNATURE_HEADERS
        .iter()
        .find(|(header, _)| headers.contains_key(*header))
        .map(|(_, provider)| *provider)
        .or_else(|| detect_from_shape(payload))
        .map(str::to_string)
}

fn detect_from_shape(payload: &Value) -> Option<&'static str> {
    let obj = payload.as_object()?;

    if is_stripe_event(payload) {
        return Some("stripe");
    }
    if obj.get("event_type").is_some_and(Value::is_string)
        && obj.get("resource").is_some_and(Value::is_object)
    {
        return Some("paypal");
    }
    if obj.get("notificationItems").is_some_and(Value::is_array) {
        return Some("adyen");
    }
    None
}

// `{"object": "event", "data": {"object": {..}}}` or a `charge.dispute.*` type.
fn is_stripe_event(payload: &Value) -> bool {
    if !payload.pointer("/data/object").is_some_and(Value::is_object) {
        return false;
    }
    let envelope = payload.get("object").and_then(Value::as_str) == Some("event");
    let dispute = payload
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| t.starts_with("charge.dispute."));
    envelope || dispute
}
