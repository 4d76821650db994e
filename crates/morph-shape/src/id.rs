//! Structural identity for shapes
//!
//! Provides [`ShapeId`], a 32-byte Blake3 digest of a shape's canonical
//! encoding. Two structurally equal shapes always share an id, regardless of
//! which type they were described from.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte structural hash (Blake3)
///
/// Used as the shape half of plan cache keys and as the key of the
/// planner's visiting set. Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeId([u8; 32]);

impl ShapeId {
    /// Create from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create id from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| IdError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Hash arbitrary bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Hash the canonical JSON encoding of a serializable value
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn of_serializable<T>(value: &T) -> Result<Self, IdError>
    where
        T: serde::Serialize,
    {
        let json = serde_json::to_vec(value)?;
        Ok(Self::compute(&json))
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ShapeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ShapeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl serde::Serialize for ShapeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ShapeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when working with shape ids
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid digest length
    #[error("invalid shape id length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_id_compute_deterministic() {
        assert_eq!(ShapeId::compute(b"shape"), ShapeId::compute(b"shape"));
        assert_ne!(ShapeId::compute(b"a"), ShapeId::compute(b"b"));
    }

    #[test]
    fn shape_id_from_slice_invalid_length() {
        let result = ShapeId::from_slice(&[0u8; 31]);
        assert!(matches!(
            result,
            Err(IdError::InvalidLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn shape_id_display_and_parse() {
        let id = ShapeId::compute(b"test");
        let parsed: ShapeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!(id.to_string().starts_with(&id.short()));
    }

    #[test]
    fn shape_id_serde_json() {
        let id = ShapeId::compute(b"test");
        let json = serde_json::to_string(&id).unwrap();
        let decoded: ShapeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, decoded);
    }
}
