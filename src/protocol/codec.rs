//! Envelope codec.
//!
//! Converts between [`Envelope`] values and the text frames carried by the
//! transport. Decoding checks the `type` tag first so an unknown type is
//! reported as [`Error::UnknownMessageType`] rather than a generic JSON error.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, from_str, from_value, to_string};

use crate::error::{Error, Result};

use super::Envelope;

// ============================================================================
// Encoding
// ============================================================================

/// Encodes an envelope into a text frame.
///
/// # Errors
///
/// Returns [`Error::Json`] if an opaque body fails to serialize.
pub fn encode(envelope: &Envelope) -> Result<String> {
    Ok(to_string(envelope)?)
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a text frame into an envelope.
///
/// # Errors
///
/// - [`Error::Json`] if the frame is not a JSON object of the expected shape
/// - [`Error::UnknownMessageType`] if the `type` tag is missing or unknown
pub fn decode(text: &str) -> Result<Envelope> {
    let value: Value = from_str(text)?;

    let message_type = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if !Envelope::TYPES.contains(&message_type) {
        return Err(Error::unknown_message_type(message_type));
    }

    Ok(from_value(value)?)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_decode_welcome() {
        let env = decode(r#"{"type":"welcome","negotiatedTimeout":100}"#).unwrap();
        match env {
            Envelope::Welcome(welcome) => assert_eq!(welcome.negotiated_timeout, 100),
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[test]
    fn test_decode_msg_keeps_body_opaque() {
        let env = decode(r#"{"type":"msg","body":{"nested":[1,2,3]}}"#).unwrap();
        assert_eq!(env, Envelope::msg(json!({ "nested": [1, 2, 3] })));
    }

    #[test]
    fn test_decode_bad() {
        let env = decode(r#"{"type":"bad","reason":"nope"}"#).unwrap();
        assert_eq!(
            env,
            Envelope::Bad {
                reason: "nope".into()
            }
        );
    }

    #[test]
    fn test_decode_busy_with_cookie() {
        let env = decode(r#"{"type":"busy","keepAlive":false,"retryAfter":100,"cookie":"c1"}"#)
            .unwrap();
        match env {
            Envelope::Busy(busy) => {
                assert!(!busy.keep_alive);
                assert_eq!(busy.retry_after, 100);
                assert_eq!(busy.cookie.as_deref(), Some("c1"));
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_type() {
        let err = decode(r#"{"type":"ping"}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownMessageType { ref message_type } if message_type == "ping"));
    }

    #[test]
    fn test_decode_missing_type() {
        let err = decode(r#"{"body":1}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownMessageType { .. }));
    }

    #[test]
    fn test_decode_malformed_json() {
        let err = decode("{not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_decode_wrong_field_type() {
        let err = decode(r#"{"type":"welcome","negotiatedTimeout":"soon"}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_encode_msg() {
        let text = encode(&Envelope::msg(json!({ "foo": "bar" }))).unwrap();
        let value: Value = from_str(&text).unwrap();
        assert_eq!(value, json!({ "type": "msg", "body": { "foo": "bar" } }));
    }
}
