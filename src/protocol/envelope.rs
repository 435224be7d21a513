//! Envelope wire type.
//!
//! # Format
//!
//! ```json
//! {"action": "subscribe", "data": ["prices", "trades"]}
//! {"action": "message", "data": [{"price": 101.5}, 7]}
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Envelope
// ============================================================================

/// Unit exchanged by the subscription protocol.
///
/// Exactly two kinds exist; any other `action` fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "lowercase")]
pub enum Envelope {
    /// Declares the full set of topics of interest, order and duplicates kept.
    Subscribe(Vec<String>),

    /// Carries opaque payload values.
    Message(Vec<Value>),
}

impl Envelope {
    /// Creates a `subscribe` envelope.
    #[inline]
    #[must_use]
    pub fn subscribe(topics: Vec<String>) -> Self {
        Self::Subscribe(topics)
    }

    /// Creates a `message` envelope.
    #[inline]
    #[must_use]
    pub fn message(values: Vec<Value>) -> Self {
        Self::Message(values)
    }

    /// Returns the wire name of this envelope's kind.
    #[inline]
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Subscribe(_) => "subscribe",
            Self::Message(_) => "message",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_subscribe_serialization() {
        let envelope = Envelope::subscribe(vec!["a".into(), "b".into(), "a".into()]);
        let json = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(json, json!({"action": "subscribe", "data": ["a", "b", "a"]}));
    }

    #[test]
    fn test_message_serialization() {
        let envelope = Envelope::message(vec![json!(1), json!({"k": "v"})]);
        let json = serde_json::to_string(&envelope).expect("serialize");
        assert_eq!(json, r#"{"action":"message","data":[1,{"k":"v"}]}"#);
    }

    #[test]
    fn test_message_deserialization() {
        let json_str = r#"{"data": ["x", null], "action": "message"}"#;
        let envelope: Envelope = serde_json::from_str(json_str).expect("parse");
        assert_eq!(envelope, Envelope::Message(vec![json!("x"), Value::Null]));
        assert_eq!(envelope.action(), "message");
    }

    #[test]
    fn test_unknown_action_rejected() {
        let json_str = r#"{"action": "unsubscribe", "data": ["a"]}"#;
        assert!(serde_json::from_str::<Envelope>(json_str).is_err());
    }

    #[test]
    fn test_missing_data_rejected() {
        let json_str = r#"{"action": "message"}"#;
        assert!(serde_json::from_str::<Envelope>(json_str).is_err());
    }

    #[test]
    fn test_subscribe_requires_string_topics() {
        let json_str = r#"{"action": "subscribe", "data": [1, 2]}"#;
        assert!(serde_json::from_str::<Envelope>(json_str).is_err());
    }
}
