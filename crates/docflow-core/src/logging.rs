//! Payload logging for raw service responses.

use serde_json::Value;
use tracing::debug;

/// Sink for raw JSON payloads exchanged with the external services.
pub trait PayloadLog: Send + Sync {
    /// Record a payload under a short label.
    fn log(&self, label: &str, value: &Value);
}

/// Emits payloads as pretty-printed JSON at DEBUG level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPayloadLog;

impl PayloadLog for TracingPayloadLog {
    fn log(&self, label: &str, value: &Value) {
        let text = match value {
            Value::Object(_) | Value::Array(_) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        debug!(payload = label, "{}", text);
    }
}

/// Discards every payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPayloadLog;

impl PayloadLog for NoopPayloadLog {
    fn log(&self, _label: &str, _value: &Value) {}
}
