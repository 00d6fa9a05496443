//! luaseal-crypto: authenticated sealing of script payloads for a TEE loader
//!
//! Architecture: Encrypt-then-MAC with per-message key separation
//!
//! Pipeline: plaintext → AES-256-CTR (enc_key, nonce) → HMAC-SHA512 (mac_key, nonce||ct) → frame
//!
//! Key hierarchy:
//! ```text
//! Master Key (shared with the TEE, hex at rest)
//!   └── HKDF-SHA512 (salt = random 128-bit per blob, info = "", 64 bytes)
//!       ├── Encryption Key [0..32)  → AES-256-CTR, counter = nonce(8) || be64 block index
//!       └── MAC Key        [32..64) → HMAC-SHA512 over nonce || ciphertext
//! ```
//!
//! Blob format:
//! ```text
//! [16 bytes: salt][64 bytes: tag][8 bytes: nonce][N bytes: ciphertext]
//! ```

pub mod codec;
pub mod error;
pub mod frame;
pub mod kdf;
pub mod secret;

pub use codec::{open, seal, seal_with_rng, verify};
pub use error::SealError;
pub use frame::Frame;
pub use kdf::{derive_keys, DerivedKeys};
pub use secret::MasterKey;

/// Size of each derived subkey in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the per-blob HKDF salt
pub const SALT_SIZE: usize = 16;

/// Size of an HMAC-SHA512 authentication tag
pub const TAG_SIZE: usize = 64;

/// Size of the CTR nonce (high half of the counter block)
pub const NONCE_SIZE: usize = 8;

/// Fixed framing overhead: salt + tag + nonce
pub const OVERHEAD: usize = SALT_SIZE + TAG_SIZE + NONCE_SIZE;
