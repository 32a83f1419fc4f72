//! Telemetry event model and export formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Hex characters kept from a value's SHA-256 digest
const VALUE_HASH_LEN: usize = 16;

/// One recorded telemetry event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(flatten)]
    pub detail: EventDetail,
}

impl TelemetryEvent {
    pub fn event_type(&self) -> &'static str {
        self.detail.event_type()
    }
}

/// Event-specific payload, tagged by `event_type` in serialized form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventDetail {
    ConfigAccess {
        path: String,
        layer: String,
        success: bool,
    },
    /// Raw values are never stored, only truncated content hashes
    ConfigChange {
        path: String,
        layer: String,
        old_value_hash: Option<String>,
        new_value_hash: String,
    },
    Performance {
        operation: String,
    },
    Error {
        error_type: String,
        message: String,
    },
}

impl EventDetail {
    pub fn event_type(&self) -> &'static str {
        match self {
            EventDetail::ConfigAccess { .. } => "config_access",
            EventDetail::ConfigChange { .. } => "config_change",
            EventDetail::Performance { .. } => "performance",
            EventDetail::Error { .. } => "error",
        }
    }
}

/// Layout of exported event files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// One JSON object per line
    #[default]
    JsonLines,
    /// A single JSON array
    JsonArray,
}

/// Truncated SHA-256 of a value's canonical JSON text
pub fn value_hash(value: &Value) -> String {
    let digest = Sha256::digest(value.to_string().as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(VALUE_HASH_LEN);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_hash_is_stable_and_short() {
        let a = value_hash(&json!({"quality": 7}));
        let b = value_hash(&json!({"quality": 7}));
        let c = value_hash(&json!({"quality": 8}));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_serialized_shape() {
        let event = TelemetryEvent {
            timestamp: Utc::now(),
            component: "configuration".to_string(),
            duration_ms: None,
            metadata: HashMap::new(),
            detail: EventDetail::ConfigAccess {
                path: "render.quality".to_string(),
                layer: "user".to_string(),
                success: true,
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "config_access");
        assert_eq!(json["path"], "render.quality");
        assert!(json.get("duration_ms").is_none());
        assert!(json["timestamp"].is_string());

        let back: TelemetryEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "config_access");
    }
}
