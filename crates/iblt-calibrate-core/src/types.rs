//! Strong type definitions for transaction identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// A 32-byte transaction identifier.
///
/// Treated as an opaque key: the calibration engine never interprets the
/// bytes, it only compares, hashes and resolves them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    /// Create a new TxId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Content-address arbitrary transaction bytes.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to a 64-character hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let invalid = |source| CoreError::InvalidTxId {
            input: s.to_string(),
            source,
        };
        let bytes = hex::decode(s).map_err(invalid)?;
        if bytes.len() != 32 {
            return Err(invalid(hex::FromHexError::InvalidStringLength));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The zero id (sentinel).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for TxId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for TxId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for TxId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_id_hex_roundtrip() {
        let id = TxId::from_bytes([0x42; 32]);
        let recovered = TxId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_tx_id_rejects_short_hex() {
        let err = TxId::from_hex("abcd").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTxId { .. }));
    }

    #[test]
    fn test_tx_id_rejects_non_hex() {
        let input = "zz".repeat(32);
        assert!(TxId::from_hex(&input).is_err());
    }

    #[test]
    fn test_tx_id_display_is_full_hex() {
        let id = TxId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", id), "ab".repeat(32));
    }

    #[test]
    fn test_tx_id_debug_is_abbreviated() {
        let id = TxId::from_bytes([0xcd; 32]);
        assert_eq!(format!("{:?}", id), "TxId(cdcdcdcdcdcdcdcd)");
    }

    #[test]
    fn test_hash_is_content_addressed() {
        assert_eq!(TxId::hash(b"tx"), TxId::hash(b"tx"));
        assert_ne!(TxId::hash(b"tx1"), TxId::hash(b"tx2"));
    }
}
