//! Value codecs
//!
//! Values are stored as opaque bytes. A store encodes typed values with one
//! codec, chosen in [`Config`](crate::Config), and callers decode with the
//! same one. Raw bytes bypass the codec entirely (`set_raw` / `get`).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BoltyError, Result};

/// Byte encoding for typed values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// JSON text (readable, interoperable)
    #[default]
    Json,

    /// bincode (compact, not self-describing)
    Bincode,
}

impl Codec {
    /// Encode a value to bytes
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Codec::Json => {
                serde_json::to_vec(value).map_err(|e| BoltyError::Serialization(e.to_string()))
            }
            Codec::Bincode => {
                bincode::serialize(value).map_err(|e| BoltyError::Serialization(e.to_string()))
            }
        }
    }

    /// Decode bytes produced by [`Codec::encode`]
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            Codec::Json => {
                serde_json::from_slice(bytes).map_err(|e| BoltyError::Serialization(e.to_string()))
            }
            Codec::Bincode => {
                bincode::deserialize(bytes).map_err(|e| BoltyError::Serialization(e.to_string()))
            }
        }
    }

    /// Short lowercase name, as accepted on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Json => "json",
            Codec::Bincode => "bincode",
        }
    }
}

impl std::str::FromStr for Codec {
    type Err = BoltyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Codec::Json),
            "bincode" => Ok(Codec::Bincode),
            other => Err(BoltyError::InvalidArgument(format!("unknown codec: {}", other))),
        }
    }
}
