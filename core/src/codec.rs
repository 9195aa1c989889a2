//! Pluggable JSON codec.
//!
//! # Design
//! The trait works on `serde_json::Value` so it stays object safe and can be
//! shared as `Arc<dyn JsonCodec>`. Typed decoding goes through `parse` and
//! then `serde_json::from_value`, which ignores fields the target type does
//! not declare unless the type opts into `deny_unknown_fields`.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BoxError;

/// JSON parser and serializer used by `ResponseView`.
pub trait JsonCodec: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Value, BoxError>;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, BoxError>;
}

/// Bind `bytes` to `T` through `codec`.
pub fn decode_with<T: DeserializeOwned>(codec: &dyn JsonCodec, bytes: &[u8]) -> Result<T, BoxError> {
    let value = codec.parse(bytes)?;
    Ok(serde_json::from_value(value)?)
}

/// `serde_json` backed codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonCodec;

impl JsonCodec for SerdeJsonCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Value, BoxError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, BoxError> {
        Ok(serde_json::to_vec(value)?)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Widget {
        id: u32,
        name: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct StrictWidget {
        #[allow(dead_code)]
        id: u32,
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let widget: Widget =
            decode_with(&SerdeJsonCodec, br#"{"id":1,"name":"bolt","extra":true}"#).unwrap();
        assert_eq!(
            widget,
            Widget {
                id: 1,
                name: "bolt".to_string()
            }
        );
    }

    #[test]
    fn strict_types_still_reject_unknown_fields() {
        let result: Result<StrictWidget, _> = decode_with(&SerdeJsonCodec, br#"{"id":1,"extra":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(SerdeJsonCodec.parse(b"not json").is_err());
    }

    #[test]
    fn encode_then_parse_preserves_value() {
        let value = serde_json::json!({"a": [1, 2], "b": null});
        let bytes = SerdeJsonCodec.encode(&value).unwrap();
        assert_eq!(SerdeJsonCodec.parse(&bytes).unwrap(), value);
    }
}
