//! Wire messages exchanged over the session channel
//!
//! Every frame is a JSON object:
//!
//! ```text
//! client -> server   {"query":"kit"}
//! server -> client   {"type":"suggestions","suggestions":["kit","kitap"],"query":"kit"}
//! server -> client   {"type":"error","message":"Failed to process request"}
//! ```
//!
//! The server echoes the query back so the client can tell whether a
//! response still belongs to the word under the caret.

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Message sent by the server whenever a request could not be answered.
/// Never carries parse or store details.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to process request";

/// Message shown by the client when a server frame cannot be decoded
pub const CLIENT_DECODE_FAILURE_MESSAGE: &str = "Error processing suggestions";

/// Client-to-server lookup request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    pub query: String,
}

impl LookupRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into() }
    }

    /// Only a JSON object is a request; serde would also accept `["kit"]`
    /// as a sequence form of the struct.
    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        match serde_json::from_str::<serde_json::Value>(payload)? {
            value @ serde_json::Value::Object(_) => Ok(serde_json::from_value(value)?),
            _ => Err(ProtocolError::NotAnObject),
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Server-to-client response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Ranked candidates for `query`, most relevant first
    Suggestions {
        suggestions: Vec<String>,
        query: String,
    },
    /// The request failed; `message` is safe to show to the user
    Error { message: String },
}

impl ServerMessage {
    pub fn suggestions(suggestions: Vec<String>, query: impl Into<String>) -> Self {
        ServerMessage::Suggestions {
            suggestions,
            query: query.into(),
        }
    }

    /// The generic failure response
    pub fn failure() -> Self {
        ServerMessage::Error {
            message: GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ServerMessage::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_suggestions_wire_shape() {
        let message = ServerMessage::suggestions(vec!["kit".into(), "kitap".into()], "kit");
        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "suggestions", "suggestions": ["kit", "kitap"], "query": "kit"})
        );
    }

    #[test]
    fn test_error_wire_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&ServerMessage::failure().to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "error", "message": "Failed to process request"}));
    }

    #[test]
    fn test_request_ignores_extra_fields() {
        let request = LookupRequest::parse(r#"{"query":"merh","client":"web"}"#).unwrap();
        assert_eq!(request.query, "merh");
    }

    #[test]
    fn test_array_payload_is_not_a_request() {
        assert!(matches!(
            LookupRequest::parse(r#"["kit"]"#),
            Err(ProtocolError::NotAnObject)
        ));
    }

    #[test]
    fn test_request_rejects_malformed_payloads() {
        for payload in [
            "",
            "merhaba",
            "{}",
            r#"{"query":5}"#,
            r#"["query"]"#,
            r#"["kit"]"#,
            r#""kit""#,
            r#"{"query":null}"#,
        ] {
            assert!(
                LookupRequest::parse(payload).is_err(),
                "expected {:?} to be rejected",
                payload
            );
        }
    }

    #[test]
    fn test_unknown_response_type_is_malformed() {
        assert!(ServerMessage::parse(r#"{"type":"progress","percent":50}"#).is_err());
        assert!(ServerMessage::parse(r#"{"type":"suggestions","suggestions":"kit","query":"k"}"#).is_err());
    }
}
