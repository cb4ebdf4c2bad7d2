//! 32-byte identifiers for blocks and transactions.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::WalletError;

const IDENTIFIER_LENGTH: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier([u8; IDENTIFIER_LENGTH]);

impl Identifier {
    /// Copies up to 32 bytes; shorter input is zero-padded on the right.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut out = [0u8; IDENTIFIER_LENGTH];
        let n = bytes.len().min(IDENTIFIER_LENGTH);
        out[..n].copy_from_slice(&bytes[..n]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LENGTH] {
        &self.0
    }

    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Identifier {
    type Err = String;

    /// Strict: only the canonical encoding (64 lowercase hex digits)
    /// survives the decode/re-encode round trip.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| "not a valid identifier".to_string())?;
        let id = Identifier::from_bytes(&bytes);
        if id.hex() != s {
            return Err("not a valid identifier".to_string());
        }
        Ok(id)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.hex())
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Identifier::from_str(&s).map_err(serde::de::Error::custom)
    }
}

pub fn validate_transaction_id(transaction_id: &str) -> Result<Identifier, WalletError> {
    Identifier::from_str(transaction_id)
        .map_err(|_| WalletError::Validation("not a valid transaction id".to_string()))
}
