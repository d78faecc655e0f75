//! Change events carried on the queue between the write path and the index consumer.
//!
//! Wire format: `{"operation": "CREATE", "hotel_id": "42"}`, optionally with the
//! full record under the entity name (`"hotel": {...}`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ServiceError};
use crate::models::{Record, RecordId};

// == Operation ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CREATE" => Some(Operation::Create),
            "UPDATE" => Some(Operation::Update),
            "DELETE" => Some(Operation::Delete),
            _ => None,
        }
    }
}

// == Change Event ==
/// Notification emitted after a successful write to the system of record.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent<R: Record> {
    pub operation: Operation,
    pub entity_id: R::Id,
    /// Full record state at publish time, when inline payloads are enabled
    pub payload: Option<R>,
}

/// Result of decoding a queue message.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<R: Record> {
    Event(ChangeEvent<R>),
    /// Well-formed message with an operation this consumer does not know
    Unknown { operation: String, entity_id: String },
}

impl<R: Record> ChangeEvent<R> {
    pub fn new(operation: Operation, entity_id: R::Id, payload: Option<R>) -> Self {
        Self {
            operation,
            entity_id,
            payload,
        }
    }

    /// Name of the identifier field on the wire (`hotel_id`).
    pub fn id_field() -> String {
        format!("{}_id", R::ENTITY)
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut body = Map::new();
        body.insert("operation".into(), Value::from(self.operation.as_str()));
        body.insert(Self::id_field(), Value::from(self.entity_id.to_string()));
        if let Some(record) = &self.payload {
            body.insert(R::ENTITY.into(), serde_json::to_value(record)?);
        }
        Ok(Value::Object(body))
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.to_json()?)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Decoded<R>> {
        let value: Value = serde_json::from_slice(bytes)?;
        let mut body = match value {
            Value::Object(body) => body,
            other => {
                return Err(ServiceError::Conversion(format!(
                    "event must be a JSON object, got {}",
                    other
                )))
            }
        };

        let operation = match body.remove("operation") {
            Some(Value::String(op)) => op,
            _ => {
                return Err(ServiceError::Conversion(
                    "event is missing its operation".into(),
                ))
            }
        };

        // Accept numeric ids as well as the canonical string form
        let raw_id = match body.remove(&Self::id_field()) {
            Some(Value::String(id)) => id,
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(ServiceError::Conversion(format!(
                    "event is missing {}",
                    Self::id_field()
                )))
            }
        };

        let Some(known) = Operation::parse(&operation) else {
            return Ok(Decoded::Unknown {
                operation,
                entity_id: raw_id,
            });
        };

        let entity_id = R::Id::parse_id(&raw_id)
            .map_err(|e| ServiceError::Conversion(format!("bad event id: {}", e)))?;

        let payload = match body.remove(R::ENTITY) {
            Some(Value::Null) | None => None,
            Some(value) => {
                let mut record: R = serde_json::from_value(value)?;
                record.set_id(entity_id.clone());
                Some(record)
            }
        };

        Ok(Decoded::Event(Self::new(known, entity_id, payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Hotel, User};

    #[test]
    fn test_wire_format_without_payload() {
        let event: ChangeEvent<Hotel> = ChangeEvent::new(Operation::Create, "42".into(), None);
        let json = event.to_json().unwrap();
        assert_eq!(json, serde_json::json!({"operation": "CREATE", "hotel_id": "42"}));
    }

    #[test]
    fn test_user_id_is_sent_as_string() {
        let event: ChangeEvent<User> = ChangeEvent::new(Operation::Delete, 7, None);
        let json = event.to_json().unwrap();
        assert_eq!(json["user_id"], "7");
    }

    #[test]
    fn test_decode_inline_payload_sets_id() {
        let raw = br#"{"operation":"UPDATE","hotel_id":"9","hotel":{"name":"Hilton"}}"#;
        let decoded = ChangeEvent::<Hotel>::decode(raw).unwrap();
        let Decoded::Event(event) = decoded else {
            panic!("expected a known event");
        };
        assert_eq!(event.operation, Operation::Update);
        let payload = event.payload.unwrap();
        assert_eq!(payload.id.as_deref(), Some("9"));
        assert_eq!(payload.name, "Hilton");
    }

    #[test]
    fn test_decode_numeric_id() {
        let raw = br#"{"operation":"DELETE","user_id":12}"#;
        let decoded = ChangeEvent::<User>::decode(raw).unwrap();
        assert_eq!(
            decoded,
            Decoded::Event(ChangeEvent::new(Operation::Delete, 12, None))
        );
    }

    #[test]
    fn test_decode_unknown_operation() {
        let raw = br#"{"operation":"ARCHIVE","hotel_id":"1"}"#;
        let decoded = ChangeEvent::<Hotel>::decode(raw).unwrap();
        assert_eq!(
            decoded,
            Decoded::Unknown {
                operation: "ARCHIVE".into(),
                entity_id: "1".into()
            }
        );
    }

    #[test]
    fn test_decode_malformed() {
        assert!(ChangeEvent::<Hotel>::decode(b"not json").is_err());
        assert!(ChangeEvent::<Hotel>::decode(br#"["CREATE"]"#).is_err());
        assert!(ChangeEvent::<Hotel>::decode(br#"{"operation":"CREATE"}"#).is_err());
        assert!(ChangeEvent::<User>::decode(br#"{"operation":"CREATE","user_id":"x"}"#).is_err());
    }
}
