//! Payload builder

use serde_json::{json, Value};

/// Command used to address an overlay field in essentials mode
pub const ESSENTIALS_COMMAND: &str = "SetOverlayContentField";

/// Default payload addressing scheme
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PayloadShape {
    /// `{"command": <command>, "value": <value>}`
    #[default]
    Command,
    /// Overlay field `fieldId` within session `id`
    Essentials { id: String },
}

impl PayloadShape {
    pub fn from_mode(essentials_mode: bool, essentials_id: &str) -> Self {
        if essentials_mode {
            Self::Essentials {
                id: essentials_id.to_string(),
            }
        } else {
            Self::Command
        }
    }
}

/// Build the request body for one field
///
/// A payload override is used verbatim.
pub fn build_payload(
    command: &str,
    value: Value,
    payload_override: Option<Value>,
    shape: &PayloadShape,
) -> Value {
    if let Some(payload) = payload_override {
        return payload;
    }

    match shape {
        PayloadShape::Command => json!({
            "command": command,
            "value": value,
        }),
        PayloadShape::Essentials { id } => json!({
            "command": ESSENTIALS_COMMAND,
            "value": value,
            "fieldId": command,
            "id": id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_shape() {
        let payload = build_payload("score", json!(3), None, &PayloadShape::Command);
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"command":"score","value":3}"#
        );
    }

    #[test]
    fn test_essentials_shape() {
        let shape = PayloadShape::from_mode(true, "abc");
        let payload = build_payload("score", json!(3), None, &shape);
        assert_eq!(
            payload,
            json!({"command": "SetOverlayContentField", "value": 3, "fieldId": "score", "id": "abc"})
        );
        assert_eq!(payload.as_object().map(|o| o.len()), Some(4));
    }

    #[test]
    fn test_override_wins_over_shape() {
        let shape = PayloadShape::from_mode(true, "abc");
        let payload = build_payload("score", json!(3), Some(json!({"v": "7"})), &shape);
        assert_eq!(payload, json!({"v": "7"}));
    }

    #[test]
    fn test_from_mode_off_ignores_id() {
        assert_eq!(PayloadShape::from_mode(false, "abc"), PayloadShape::Command);
    }
}
