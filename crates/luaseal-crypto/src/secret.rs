//! Long-term master key shared between the packer and the TEE loader

use zeroize::Zeroize;

use crate::error::SealError;

/// The shared master key. Never empty.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct MasterKey {
    bytes: Vec<u8>,
}

impl MasterKey {
    /// Wrap raw key bytes. Rejects an empty key.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SealError> {
        if bytes.is_empty() {
            return Err(SealError::InvalidInput("master key must not be empty".into()));
        }
        Ok(Self { bytes })
    }

    /// Parse a hex-encoded key, ignoring surrounding whitespace.
    ///
    /// The decode error is not forwarded since its message can echo key
    /// characters.
    pub fn from_hex(text: &str) -> Result<Self, SealError> {
        let bytes = hex::decode(text.trim())
            .map_err(|_| SealError::InvalidInput("master key is not valid hex".into()))?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        let err = MasterKey::from_bytes(Vec::new()).unwrap_err();
        assert!(matches!(err, SealError::InvalidInput(_)));
    }

    #[test]
    fn test_from_hex_trims_whitespace() {
        let key = MasterKey::from_hex("  00ff10\n").unwrap();
        assert_eq!(key.as_bytes(), &[0x00, 0xff, 0x10]);
        assert_eq!(key.len(), 3);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        let err = MasterKey::from_hex("not-hex!").unwrap_err();
        assert!(matches!(err, SealError::InvalidInput(_)));
        assert!(!err.to_string().contains("not-hex"));
    }

    #[test]
    fn test_from_hex_rejects_blank() {
        assert!(MasterKey::from_hex("   ").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = MasterKey::from_bytes(vec![0xAB; 32]).unwrap();
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.to_lowercase().contains("ab, ab"));
        assert!(!rendered.contains("171"));
    }
}
