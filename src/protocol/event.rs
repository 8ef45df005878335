//! Event Messages
//!
//! Decoding of inbound frames and encoding of outbound ones.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ProtocolError;
use crate::dispatch::HandlerError;

/// Named parameters of an event, i.e. everything except `op`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(Map<String, Value>);

impl Fields {
    /// Create an empty field set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a field, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Raw JSON value of a field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Deserialize a field that must be present.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| HandlerError::MissingField(name.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|source| HandlerError::InvalidField {
            field: name.to_string(),
            source,
        })
    }

    /// Deserialize a field that may be absent. `null` counts as absent.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, HandlerError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|source| {
                HandlerError::InvalidField {
                    field: name.to_string(),
                    source,
                }
            }),
        }
    }

    /// Deserialize the whole field set into a payload struct.
    ///
    /// Fields the struct does not name are ignored.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, HandlerError> {
        serde_json::from_value(Value::Object(self.0)).map_err(HandlerError::InvalidPayload)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Fields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A decoded inbound event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Operation name used to pick a handler
    pub op: String,
    /// Remaining fields, passed to the handler
    pub fields: Fields,
}

impl Event {
    pub fn new(op: impl Into<String>, fields: Fields) -> Self {
        Self {
            op: op.into(),
            fields,
        }
    }

    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decode a binary frame holding UTF-8 JSON.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(data).map_err(|_| ProtocolError::InvalidUtf8)?;
        Self::parse(text)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut map) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let op = match map.remove("op") {
            Some(Value::String(op)) => op,
            Some(_) => return Err(ProtocolError::InvalidOp),
            None => return Err(ProtocolError::MissingOp),
        };

        Ok(Self {
            op,
            fields: Fields(map),
        })
    }

    /// Encode back into wire text
    pub fn encode(&self) -> String {
        encode(&self.op, &self.fields)
    }
}

/// Serialize `{op, **fields}` into wire text.
///
/// A field named `op` never overrides the op argument.
pub fn encode(op: &str, fields: &Fields) -> String {
    let mut map = fields.0.clone();
    map.insert("op".to_string(), Value::String(op.to_string()));
    Value::Object(map).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_splits_op_from_fields() {
        let event = Event::parse(r#"{"op": "chatmsg", "text": "hi", "n": 3}"#).unwrap();
        assert_eq!(event.op, "chatmsg");
        assert_eq!(event.fields.len(), 2);
        assert_eq!(event.fields.get("text"), Some(&json!("hi")));
        assert!(event.fields.get("op").is_none());
    }

    #[test]
    fn test_parse_rejects_bad_frames() {
        assert!(matches!(
            Event::parse("not json"),
            Err(ProtocolError::InvalidJson(_))
        ));
        assert!(matches!(
            Event::parse(r#"[1, 2]"#),
            Err(ProtocolError::NotAnObject)
        ));
        assert!(matches!(
            Event::parse(r#"{"text": "hi"}"#),
            Err(ProtocolError::MissingOp)
        ));
        assert!(matches!(
            Event::parse(r#"{"op": 7}"#),
            Err(ProtocolError::InvalidOp)
        ));
        assert!(matches!(
            Event::parse_bytes(&[0xff, 0xfe]),
            Err(ProtocolError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_parse_bytes() {
        let event = Event::parse_bytes(br#"{"op": "ping"}"#).unwrap();
        assert_eq!(event.op, "ping");
        assert!(event.fields.is_empty());
    }

    #[test]
    fn test_encode_op_wins() {
        let fields = Fields::new().with("op", "spoofed").with("text", "hi");
        let value: Value = serde_json::from_str(&encode("chatmsg", &fields)).unwrap();
        assert_eq!(value, json!({"op": "chatmsg", "text": "hi"}));
    }

    #[test]
    fn test_require_and_optional() {
        let fields = Fields::new().with("name", "ada").with("age", "old");

        let name: String = fields.require("name").unwrap();
        assert_eq!(name, "ada");

        let missing = fields.require::<String>("email").unwrap_err();
        assert!(matches!(missing, HandlerError::MissingField(ref f) if f == "email"));

        let wrong_type = fields.require::<u32>("age").unwrap_err();
        assert!(matches!(wrong_type, HandlerError::InvalidField { ref field, .. } if field == "age"));

        assert_eq!(fields.optional::<String>("email").unwrap(), None);
    }

    #[test]
    fn test_parse_payload_ignores_extra_fields() {
        #[derive(Debug, Deserialize)]
        struct Rename {
            name: String,
        }

        let fields = Fields::new().with("name", "ada").with("colour", "blue");
        let payload: Rename = fields.parse().unwrap();
        assert_eq!(payload.name, "ada");

        let err = Fields::new().parse::<Rename>().unwrap_err();
        assert!(matches!(err, HandlerError::InvalidPayload(_)));
    }
}
