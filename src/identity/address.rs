//! Wallet addresses.

use crate::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte wallet address.
///
/// Parsing is case-insensitive and accepts an optional `0x` prefix; the
/// canonical text form is lowercase `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress([u8; ADDRESS_LEN]);

impl WalletAddress {
    /// Wrap raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Parse a hex address.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MalformedAddress` unless the input is
    /// exactly 40 hex digits after an optional `0x`/`0X` prefix.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != ADDRESS_LEN * 2 {
            return Err(ValidationError::MalformedAddress(s.to_string()));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| ValidationError::MalformedAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl FromStr for WalletAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({self})")
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MIXED: &str = "0xAbCdEf0123456789aBcDeF0123456789ABCDEF01";

    #[test]
    fn test_parse_is_case_insensitive_and_canonical() {
        let a = WalletAddress::parse(MIXED).unwrap();
        let b = WalletAddress::parse(&MIXED.to_lowercase()).unwrap();
        let c = WalletAddress::parse(&MIXED[2..]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.to_string(), MIXED.to_lowercase());
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "0x", "0x1234", "zz", "0xgggggggggggggggggggggggggggggggggggggggg"] {
            assert!(
                matches!(WalletAddress::parse(bad), Err(ValidationError::MalformedAddress(_))),
                "{bad:?} should be rejected"
            );
        }
        // 21 bytes
        let long = format!("{MIXED}ff");
        assert!(WalletAddress::parse(&long).is_err());
    }

    #[test]
    fn test_serde_as_canonical_string() {
        let a = WalletAddress::parse(MIXED).unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{}\"", MIXED.to_lowercase()));
        let back: WalletAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
