//! Seal and open: AES-256-CTR encryption with an HMAC-SHA512 tag
//!
//! `seal` draws a fresh salt and nonce for every call, so two blobs of the
//! same script under the same master key share no key material.
//! `open` authenticates before it decrypts and never returns plaintext from
//! a blob whose tag does not verify.

use aes::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::SealError;
use crate::frame::{sealed_len, Frame, CIPHERTEXT_OFFSET, NONCE_OFFSET, TAG_OFFSET};
use crate::kdf::{derive_keys, DerivedKeys};
use crate::secret::MasterKey;
use crate::{KEY_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE};

/// AES-256 in counter mode with a 64-bit big-endian block counter in the low
/// half of the counter block.
type Aes256Ctr = ctr::Ctr64BE<aes::Aes256>;

type HmacSha512 = Hmac<Sha512>;

/// Seal `plaintext` under `master` using the thread-local CSPRNG.
///
/// Returns `[16-byte salt][64-byte tag][8-byte nonce][ciphertext]`.
pub fn seal(master: &MasterKey, plaintext: &[u8]) -> Result<Vec<u8>, SealError> {
    seal_with_rng(&mut rand::thread_rng(), master, plaintext)
}

/// Seal `plaintext` drawing the salt and nonce from `rng`.
///
/// The salt (16 bytes) is drawn first, then the nonce (8 bytes).
pub fn seal_with_rng<R>(rng: &mut R, master: &MasterKey, plaintext: &[u8]) -> Result<Vec<u8>, SealError>
where
    R: RngCore + CryptoRng,
{
    let mut salt = [0u8; SALT_SIZE];
    rng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);

    let keys = derive_keys(master, &salt)?;

    let mut blob = Vec::with_capacity(sealed_len(plaintext.len()));
    blob.extend_from_slice(&salt);
    blob.resize(NONCE_OFFSET, 0);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(plaintext);

    apply_keystream(keys.enc_key(), &nonce, &mut blob[CIPHERTEXT_OFFSET..]);
    let tag = compute_tag(&keys, &blob[NONCE_OFFSET..])?;
    blob[TAG_OFFSET..NONCE_OFFSET].copy_from_slice(&tag);

    debug!(payload_len = plaintext.len(), blob_len = blob.len(), "sealed payload");
    Ok(blob)
}

/// Verify and decrypt a blob produced by [`seal`].
///
/// - `Format` if the blob is shorter than the fixed overhead
/// - `Authentication` if the tag does not match (wrong key or tampered blob)
pub fn open(master: &MasterKey, blob: &[u8]) -> Result<Vec<u8>, SealError> {
    let (frame, keys) = authenticate(master, blob)?;

    let mut plaintext = frame.ciphertext.to_vec();
    apply_keystream(keys.enc_key(), frame.nonce, &mut plaintext);

    debug!(payload_len = plaintext.len(), "opened payload");
    Ok(plaintext)
}

/// Check a blob's tag without decrypting it. Returns the payload length.
pub fn verify(master: &MasterKey, blob: &[u8]) -> Result<usize, SealError> {
    let (frame, _keys) = authenticate(master, blob)?;
    Ok(frame.payload_len())
}

/// The verify gate shared by `open` and `verify`. On success the derived
/// keys are handed back so the caller can decrypt; on failure they are
/// dropped (and zeroized) here.
fn authenticate<'a>(master: &MasterKey, blob: &'a [u8]) -> Result<(Frame<'a>, DerivedKeys), SealError> {
    let frame = Frame::parse(blob)?;
    let keys = derive_keys(master, frame.salt)?;
    let expected = compute_tag(&keys, frame.authenticated_bytes())?;

    if !bool::from(frame.tag[..].ct_eq(&expected[..])) {
        debug!(blob_len = blob.len(), "blob rejected: tag mismatch");
        return Err(SealError::Authentication);
    }

    Ok((frame, keys))
}

/// HMAC-SHA512 over `nonce || ciphertext`.
fn compute_tag(keys: &DerivedKeys, authenticated: &[u8]) -> Result<[u8; TAG_SIZE], SealError> {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(keys.mac_key())
        .map_err(|e| SealError::InvalidInput(format!("HMAC key rejected: {e}")))?;
    mac.update(authenticated);

    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// XOR `buf` with the keystream for (`key`, `nonce`). Encrypt and decrypt are
/// the same operation.
fn apply_keystream(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], buf: &mut [u8]) {
    let mut counter_block = [0u8; 16];
    counter_block[..NONCE_SIZE].copy_from_slice(nonce);

    let mut cipher = Aes256Ctr::new(key.into(), &counter_block.into());
    cipher.apply_keystream(buf);
}
