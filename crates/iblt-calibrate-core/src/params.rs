//! Reconciliation parameters: the encoding shape of a single trial.
//!
//! `cell_count` is the value under calibration. Every other encoding field is
//! held fixed for the duration of a calibration run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size in bytes of the per-cell counter field.
pub const COUNT_FIELD_SIZE: u64 = 4;

/// Encoding parameters that stay fixed while the cell count is searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingParams {
    /// Number of hash functions (cells touched per key).
    pub hash_function_count: u32,
    /// Key size in bytes.
    pub key_size: u32,
    /// Value size in bytes.
    pub value_size: u32,
    /// Key-hash checksum size in bytes (0 disables the checksum).
    pub key_hash_size: u32,
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self {
            hash_function_count: 3,
            key_size: 8,
            value_size: 64,
            key_hash_size: 4,
        }
    }
}

impl EncodingParams {
    /// Bytes occupied by one cell.
    pub fn cell_size(&self) -> u64 {
        u64::from(self.key_size)
            + u64::from(self.value_size)
            + u64::from(self.key_hash_size)
            + COUNT_FIELD_SIZE
    }
}

/// A deterministic 32-byte seed for the oracle's internal randomness.
///
/// Same salt and same transaction sets must give the same oracle outcome.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Salt(pub [u8; 32]);

impl Salt {
    /// Big-endian `value` in the first eight bytes, zero elsewhere.
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Derive the salt for trial `index` of a run seeded with `seed`.
    pub fn derive(seed: u64, index: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"iblt-calibrate-salt-v0:");
        hasher.update(&seed.to_be_bytes());
        hasher.update(b":");
        hasher.update(&index.to_be_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", &hex::encode(self.0)[..16])
    }
}

/// Everything the oracle needs to know about one trial besides the sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationParameters {
    pub hash_function_count: u32,
    pub key_size: u32,
    pub value_size: u32,
    pub key_hash_size: u32,
    /// Number of cells in the table; the calibrated quantity.
    pub cell_count: u64,
    /// Transactions only the sender has.
    pub extra_count: usize,
    /// Transactions only the receiver has.
    pub absent_count: usize,
    /// Optional deterministic seed.
    pub salt: Option<Salt>,
}

impl ReconciliationParameters {
    /// Build parameters with zero set sizes and no salt.
    pub fn new(encoding: EncodingParams, cell_count: u64) -> Self {
        Self {
            hash_function_count: encoding.hash_function_count,
            key_size: encoding.key_size,
            value_size: encoding.value_size,
            key_hash_size: encoding.key_hash_size,
            cell_count,
            extra_count: 0,
            absent_count: 0,
            salt: None,
        }
    }

    /// Set the expected set sizes.
    pub fn with_counts(mut self, extra_count: usize, absent_count: usize) -> Self {
        self.extra_count = extra_count;
        self.absent_count = absent_count;
        self
    }

    /// Attach a deterministic salt.
    pub fn with_salt(mut self, salt: Salt) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Same parameters at a different cell count.
    pub fn with_cell_count(mut self, cell_count: u64) -> Self {
        self.cell_count = cell_count;
        self
    }

    /// The fixed part of the encoding.
    pub fn encoding(&self) -> EncodingParams {
        EncodingParams {
            hash_function_count: self.hash_function_count,
            key_size: self.key_size,
            value_size: self.value_size,
            key_hash_size: self.key_hash_size,
        }
    }

    /// Total table size in bytes.
    pub fn iblt_size(&self) -> u64 {
        self.cell_count.saturating_mul(self.encoding().cell_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iblt_size() {
        let params = ReconciliationParameters::new(EncodingParams::default(), 100);
        // 8 + 64 + 4 + 4
        assert_eq!(params.iblt_size(), 8000);
    }

    #[test]
    fn test_salt_from_u64_layout() {
        let salt = Salt::from_u64(22);
        assert_eq!(salt.0[7], 22);
        assert!(salt.0[..7].iter().all(|b| *b == 0));
        assert!(salt.0[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_salt_derive_is_stable_and_index_sensitive() {
        assert_eq!(Salt::derive(7, 3), Salt::derive(7, 3));
        assert_ne!(Salt::derive(7, 3), Salt::derive(7, 4));
        assert_ne!(Salt::derive(7, 3), Salt::derive(8, 3));
    }

    #[test]
    fn test_with_cell_count_keeps_other_fields() {
        let base = ReconciliationParameters::new(EncodingParams::default(), 10)
            .with_counts(5, 6)
            .with_salt(Salt::from_u64(1));
        let moved = base.with_cell_count(20);
        assert_eq!(moved.cell_count, 20);
        assert_eq!(moved.encoding(), base.encoding());
        assert_eq!(moved.extra_count, 5);
        assert_eq!(moved.absent_count, 6);
        assert_eq!(moved.salt, base.salt);
    }

    #[test]
    fn test_encoding_params_default_from_empty_json() {
        let params: EncodingParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params, EncodingParams::default());
    }
}
