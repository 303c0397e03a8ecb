//! Inbound push message classification
//!
//! Pure function from a raw text frame to a classified message. Never fails:
//! anything that cannot be understood becomes `Classified::Malformed` and is
//! dropped by the caller.
//!
//! Two payload shapes are accepted: fields wrapped under `data`, and fields at
//! the top level (legacy `confirmation_update`). When both carry a field, the
//! top-level value wins.

use serde_json::{Map, Value};

use crate::constants::protocol;
use crate::models::{EventKind, EventPayload};
use crate::utils::parse_amount;

/// Result of classifying one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Bare liveness reply; no entry
    LivenessReply,
    /// `{"type":"connected"}`; no entry
    HandshakeAck,
    /// Unparseable frame; logged and dropped
    Malformed { reason: String },
    /// Application event that produces a feed entry
    Event {
        kind: EventKind,
        event_type: String,
        payload: EventPayload,
    },
}

impl Classified {
    pub fn is_event(&self) -> bool {
        matches!(self, Classified::Event { .. })
    }
}

/// Classify a raw text frame
pub fn classify(raw: &str) -> Classified {
    let trimmed = raw.trim();
    if trimmed == protocol::LIVENESS_REPLY {
        tracing::trace!("Liveness reply received");
        return Classified::LivenessReply;
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, frame_len = raw.len(), "Dropping unparseable push message");
            return Classified::Malformed {
                reason: e.to_string(),
            };
        }
    };

    let Value::Object(root) = value else {
        tracing::warn!("Dropping non-object push message");
        return Classified::Malformed {
            reason: "payload is not a JSON object".to_string(),
        };
    };

    let event_type = root
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if event_type == protocol::CONNECTED {
        tracing::debug!("Push handshake acknowledged by server");
        return Classified::HandshakeAck;
    }

    let nested = root.get("data").and_then(Value::as_object);
    let payload = extract_payload(&root, nested);
    let kind = EventKind::from_type(&event_type);

    if kind == EventKind::Unknown {
        tracing::debug!(event_type = %event_type, "Unrecognized push event type");
    }

    Classified::Event {
        kind,
        event_type,
        payload,
    }
}

fn extract_payload(root: &Map<String, Value>, nested: Option<&Map<String, Value>>) -> EventPayload {
    let field = |name: &str| lookup(root, nested, name);

    EventPayload {
        tx_hash: field("tx_hash").and_then(as_text),
        amount: field("amount").and_then(parse_amount),
        confirmations: field("confirmations").and_then(as_count),
        status: field("status").and_then(as_text),
        block_number: field("block_number").and_then(as_count),
        wallet_address: field("wallet_address").and_then(as_text),
    }
}

/// Top-level value first, then the nested one; `null` counts as absent
fn lookup<'a>(
    root: &'a Map<String, Value>,
    nested: Option<&'a Map<String, Value>>,
    name: &str,
) -> Option<&'a Value> {
    root.get(name)
        .filter(|v| !v.is_null())
        .or_else(|| nested.and_then(|d| d.get(name)).filter(|v| !v.is_null()))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
