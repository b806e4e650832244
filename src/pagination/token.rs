//! Continuation token codec.
//!
//! A page token is the backend's last-evaluated key, serialized as DynamoDB
//! JSON and wrapped in unpadded base64url. Tokens carry no signature: they
//! are handed back by the same client that received them.

use std::collections::BTreeMap;
use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{PaginationError, Result};

/// Unpadded URL-safe alphabet; decoding tolerates clients that re-add padding.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Typed key attribute, serialized in DynamoDB JSON form (`{"S":"2"}`).
///
/// Only scalar types appear here: key schemas never hold lists, maps or sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAttribute {
    S(String),
    N(String),
    B(#[serde(with = "blob")] Vec<u8>),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
}

impl KeyAttribute {
    /// String value, if this is an `S` attribute.
    pub fn as_s(&self) -> Option<&str> {
        match self {
            KeyAttribute::S(s) => Some(s),
            _ => None,
        }
    }
}

/// Backend-native continuation marker: attribute name to typed value.
pub type LastKey = BTreeMap<String, KeyAttribute>;

/// Opaque continuation token handed to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for PageToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a last-evaluated key into a page token.
pub fn encode(last_key: &LastKey) -> Result<PageToken> {
    let json = serde_json::to_vec(last_key).map_err(PaginationError::Encoding)?;
    Ok(PageToken(TOKEN_ENGINE.encode(json)))
}

/// Decode a page token back into the key it was built from.
///
/// Fails with [`PaginationError::InvalidToken`] on bad base64, bad JSON, or
/// JSON that is not a map of typed attributes.
pub fn decode(token: &str) -> Result<LastKey> {
    let bytes = TOKEN_ENGINE
        .decode(token.as_bytes())
        .map_err(|e| PaginationError::InvalidToken(format!("not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| PaginationError::InvalidToken(format!("not a key mapping: {}", e)))
}

mod blob {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "dynamo")]
mod dynamo {
    use std::collections::HashMap;

    use aws_sdk_dynamodb::primitives::Blob;
    use aws_sdk_dynamodb::types::AttributeValue;

    use super::{KeyAttribute, LastKey};
    use crate::pagination::{PaginationError, Result};

    impl TryFrom<AttributeValue> for KeyAttribute {
        type Error = PaginationError;

        fn try_from(value: AttributeValue) -> Result<Self> {
            match value {
                AttributeValue::S(s) => Ok(KeyAttribute::S(s)),
                AttributeValue::N(n) => Ok(KeyAttribute::N(n)),
                AttributeValue::B(b) => Ok(KeyAttribute::B(b.into_inner())),
                AttributeValue::Bool(b) => Ok(KeyAttribute::Bool(b)),
                AttributeValue::Null(n) => Ok(KeyAttribute::Null(n)),
                other => Err(PaginationError::UnsupportedAttribute(format!("{:?}", other))),
            }
        }
    }

    impl From<KeyAttribute> for AttributeValue {
        fn from(value: KeyAttribute) -> Self {
            match value {
                KeyAttribute::S(s) => AttributeValue::S(s),
                KeyAttribute::N(n) => AttributeValue::N(n),
                KeyAttribute::B(b) => AttributeValue::B(Blob::new(b)),
                KeyAttribute::Bool(b) => AttributeValue::Bool(b),
                KeyAttribute::Null(n) => AttributeValue::Null(n),
            }
        }
    }

    /// Convert an SDK `LastEvaluatedKey` into a codec key.
    pub fn last_key_from_dynamo(map: HashMap<String, AttributeValue>) -> Result<LastKey> {
        map.into_iter()
            .map(|(name, value)| Ok((name, KeyAttribute::try_from(value)?)))
            .collect()
    }

    /// Convert a codec key into an SDK `ExclusiveStartKey`.
    pub fn last_key_to_dynamo(key: LastKey) -> HashMap<String, AttributeValue> {
        key.into_iter()
            .map(|(name, value)| (name, AttributeValue::from(value)))
            .collect()
    }
}

#[cfg(feature = "dynamo")]
pub use dynamo::{last_key_from_dynamo, last_key_to_dynamo};
