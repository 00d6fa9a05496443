//! Blob framing
//!
//! Layout (all offsets fixed):
//! ```text
//! 0        16                 80       88
//! [ salt ][ tag (HMAC-SHA512) ][ nonce ][ ciphertext ... ]
//!                             \________ MAC input ________/
//! ```

use crate::error::SealError;
use crate::{NONCE_SIZE, OVERHEAD, SALT_SIZE, TAG_SIZE};

/// Offset of the tag within a blob
pub const TAG_OFFSET: usize = SALT_SIZE;

/// Offset of the nonce within a blob; also where the MAC input starts
pub const NONCE_OFFSET: usize = SALT_SIZE + TAG_SIZE;

/// Offset of the ciphertext within a blob
pub const CIPHERTEXT_OFFSET: usize = OVERHEAD;

/// Borrowed view of a blob's fields. Parsing does no authentication.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub salt: &'a [u8; SALT_SIZE],
    pub tag: &'a [u8; TAG_SIZE],
    pub nonce: &'a [u8; NONCE_SIZE],
    pub ciphertext: &'a [u8],
    authenticated: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Split a blob into its fields, or `Format` if it is shorter than the
    /// fixed overhead.
    pub fn parse(blob: &'a [u8]) -> Result<Self, SealError> {
        let too_short = || SealError::Format { len: blob.len() };

        let (salt, rest) = blob.split_first_chunk::<SALT_SIZE>().ok_or_else(too_short)?;
        let (tag, authenticated) = rest.split_first_chunk::<TAG_SIZE>().ok_or_else(too_short)?;
        let (nonce, ciphertext) = authenticated
            .split_first_chunk::<NONCE_SIZE>()
            .ok_or_else(too_short)?;

        Ok(Self {
            salt,
            tag,
            nonce,
            ciphertext,
            authenticated,
        })
    }

    /// The bytes covered by the tag: `nonce || ciphertext`.
    pub fn authenticated_bytes(&self) -> &'a [u8] {
        self.authenticated
    }

    /// Length of the plaintext this frame decrypts to.
    pub fn payload_len(&self) -> usize {
        self.ciphertext.len()
    }
}

/// Total blob size for a plaintext of `payload_len` bytes.
pub fn sealed_len(payload_len: usize) -> usize {
    OVERHEAD + payload_len
}
