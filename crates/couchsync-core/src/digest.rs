//! Content fingerprints.
//!
//! A [`Digest`] is the BLAKE3 hash of a byte blob. It is used both to decide
//! whether an attachment changed and as the lookup key of the object store.
//! It is not a security boundary, only a change oracle.

use std::fmt;
use std::path::Path;

use crate::error::{CoreError, Result};

/// A 32-byte BLAKE3 content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Compute the digest of the given bytes.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Compute the digest of a file's contents.
    pub fn of_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::of(&data))
    }

    /// Convert to the lowercase hex form stored in documents.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidDigest(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidDigest(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        assert_eq!(Digest::of(b"function helper(){}\n"), Digest::of(b"function helper(){}\n"));
        assert_ne!(Digest::of(b"a"), Digest::of(b"b"));
    }

    #[test]
    fn test_digest_hex_roundtrip() {
        let digest = Digest::of(b"hello");
        let hex = digest.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Digest::from_hex(&hex).unwrap(), digest);
    }

    #[test]
    fn test_digest_rejects_short_hex() {
        assert!(Digest::from_hex("abcd").is_err());
        assert!(Digest::from_hex("zz").is_err());
    }

    #[test]
    fn test_digest_of_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0u8, 159, 146, 150]).unwrap();
        assert_eq!(Digest::of_file(&path).unwrap(), Digest::of(&[0u8, 159, 146, 150]));
    }

    #[test]
    fn test_digest_debug() {
        let debug = format!("{:?}", Digest::from_hex(&"cd".repeat(32)).unwrap());
        assert_eq!(debug, "Digest(cdcdcdcdcdcdcdcd)");
    }
}
