//! Key derivation: master key + per-blob salt → (encryption key, MAC key)

use hkdf::Hkdf;
use sha2::Sha512;
use zeroize::Zeroize;

use crate::error::SealError;
use crate::secret::MasterKey;
use crate::{KEY_SIZE, SALT_SIZE};

/// The two subkeys used for a single seal or open call.
///
/// Zeroized on drop; callers should let it fall out of scope as soon as the
/// call completes.
pub struct DerivedKeys {
    enc: [u8; KEY_SIZE],
    mac: [u8; KEY_SIZE],
}

impl DerivedKeys {
    pub fn enc_key(&self) -> &[u8; KEY_SIZE] {
        &self.enc
    }

    pub fn mac_key(&self) -> &[u8; KEY_SIZE] {
        &self.mac
    }
}

impl Drop for DerivedKeys {
    fn drop(&mut self) {
        self.enc.zeroize();
        self.mac.zeroize();
    }
}

impl zeroize::ZeroizeOnDrop for DerivedKeys {}

impl std::fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeys")
            .field("enc", &"[REDACTED]")
            .field("mac", &"[REDACTED]")
            .finish()
    }
}

/// Derive the encryption and MAC keys for one blob.
///
/// HKDF-SHA512 with the master key as IKM, `salt` as the HKDF salt and an
/// empty info string, expanded to 64 bytes and split in half: the first 32
/// bytes key AES-256-CTR, the last 32 bytes key HMAC-SHA512.
pub fn derive_keys(master: &MasterKey, salt: &[u8]) -> Result<DerivedKeys, SealError> {
    if salt.len() != SALT_SIZE {
        return Err(SealError::InvalidInput(format!(
            "salt must be {SALT_SIZE} bytes, got {}",
            salt.len()
        )));
    }
    if master.is_empty() {
        return Err(SealError::InvalidInput("master key must not be empty".into()));
    }

    let hkdf = Hkdf::<Sha512>::new(Some(salt), master.as_bytes());
    let mut okm = [0u8; 2 * KEY_SIZE];
    hkdf.expand(&[], &mut okm)
        .map_err(|e| SealError::InvalidInput(format!("HKDF expand failed: {e}")))?;

    let mut keys = DerivedKeys {
        enc: [0u8; KEY_SIZE],
        mac: [0u8; KEY_SIZE],
    };
    keys.enc.copy_from_slice(&okm[..KEY_SIZE]);
    keys.mac.copy_from_slice(&okm[KEY_SIZE..]);
    okm.zeroize();

    Ok(keys)
}
