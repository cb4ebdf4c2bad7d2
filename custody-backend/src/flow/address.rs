//! Flow account addresses and chain-specific validation.
//!
//! Flow addresses are codewords of a [64, 45] linear code, XORed with a
//! per-network constant. An address is valid for a chain when the parity
//! check of `address ^ network_codeword` is zero.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::WalletError;

const ADDRESS_LENGTH: usize = 8;

/// Columns of the parity-check matrix, one per bit of the address.
const PARITY_CHECK_MATRIX_COLUMNS: [u64; 64] = [
    0x00001, 0x00002, 0x00004, 0x00008, 0x00010, 0x00020, 0x00040, 0x00080, 0x00100, 0x00200,
    0x00400, 0x00800, 0x01000, 0x02000, 0x04000, 0x08000, 0x10000, 0x20000, 0x40000, 0x7328d,
    0x6689a, 0x6112f, 0x6084b, 0x433fd, 0x42aab, 0x41951, 0x233ce, 0x22a81, 0x21948, 0x1ef60,
    0x1deca, 0x1c639, 0x1bdd8, 0x1a535, 0x194ac, 0x18c46, 0x1632b, 0x1529b, 0x14a43, 0x13184,
    0x12942, 0x118c1, 0x0f812, 0x0e027, 0x0d00e, 0x0c83c, 0x0b01d, 0x0a831, 0x0982b, 0x07034,
    0x0682a, 0x05819, 0x03807, 0x007d2, 0x00727, 0x0068e, 0x0067c, 0x0059d, 0x004eb, 0x003b4,
    0x0036a, 0x002d9, 0x001c7, 0x0003f,
];

/// Network the service is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainId {
    #[serde(rename = "flow-mainnet")]
    Mainnet,
    #[serde(rename = "flow-testnet")]
    Testnet,
    #[serde(rename = "flow-emulator")]
    Emulator,
}

impl ChainId {
    fn network_codeword(self) -> u64 {
        match self {
            ChainId::Mainnet => 0,
            ChainId::Testnet => 0x6834_ba37_b398_0209,
            ChainId::Emulator => 0x1cb1_5985_7af0_2018,
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainId::Mainnet => write!(f, "flow-mainnet"),
            ChainId::Testnet => write!(f, "flow-testnet"),
            ChainId::Emulator => write!(f, "flow-emulator"),
        }
    }
}

impl FromStr for ChainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flow-mainnet" => Ok(ChainId::Mainnet),
            "flow-testnet" => Ok(ChainId::Testnet),
            "flow-emulator" => Ok(ChainId::Emulator),
            _ => Err(format!("Unknown chain id: {}", s)),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowAddress([u8; ADDRESS_LENGTH]);

impl FlowAddress {
    pub fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    pub fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// Hex without the `0x` prefix, as used inside event type identifiers.
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Canonical `0x`-prefixed form.
    pub fn to_string_full(&self) -> String {
        format!("0x{}", self.hex())
    }

    pub fn is_valid_for(&self, chain: ChainId) -> bool {
        let mut codeword = self.to_u64() ^ chain.network_codeword();
        if codeword == 0 {
            return false;
        }

        let mut parity = 0u64;
        for column in PARITY_CHECK_MATRIX_COLUMNS {
            if codeword & 1 == 1 {
                parity ^= column;
            }
            codeword >>= 1;
        }
        parity == 0
    }
}

impl FromStr for FlowAddress {
    type Err = String;

    /// Accepts an optional `0x` prefix and left-pads short input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.is_empty() || digits.len() > ADDRESS_LENGTH * 2 {
            return Err(format!("not a valid address: {}", s));
        }

        let padded = format!("{:0>16}", digits);
        let bytes = hex::decode(&padded).map_err(|_| format!("not a valid address: {}", s))?;

        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for FlowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.hex())
    }
}

impl fmt::Debug for FlowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlowAddress(0x{})", self.hex())
    }
}

impl Serialize for FlowAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string_full())
    }
}

impl<'de> Deserialize<'de> for FlowAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FlowAddress::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Parses `address` and checks it belongs to `chain`.
pub fn validate_address(address: &str, chain: ChainId) -> Result<FlowAddress, WalletError> {
    let parsed = FlowAddress::from_str(address.trim()).map_err(WalletError::Validation)?;
    if !parsed.is_valid_for(chain) {
        return Err(WalletError::Validation(format!(
            "not a valid address for {}: {}",
            chain, address
        )));
    }
    Ok(parsed)
}
