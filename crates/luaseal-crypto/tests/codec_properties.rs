//! Wire-format and property tests for the seal/open construction.
//!
//! The known-answer blobs were produced by the reference Python packer
//! (HKDF-SHA512, AES-256-CTR with an 8-byte nonce, HMAC-SHA512) so these
//! pin byte compatibility with the TEE loader.

use luaseal_crypto::{open, seal, seal_with_rng, verify, Frame, MasterKey, SealError, OVERHEAD};
use proptest::prelude::*;
use rand::{CryptoRng, RngCore};

const REFERENCE_KEY: &str = "432A462D4A614E645267556A586E3272357538782F413F4428472B4B62506553";

/// Replays a fixed byte sequence: salt `00..0f`, then nonce `a0..a7`.
struct ReplayRng {
    bytes: Vec<u8>,
    pos: usize,
}

impl ReplayRng {
    fn reference() -> Self {
        let mut bytes: Vec<u8> = (0x00..0x10).collect();
        bytes.extend(0xa0..0xa8);
        Self { bytes, pos: 0 }
    }
}

impl RngCore for ReplayRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let end = self.pos + dest.len();
        dest.copy_from_slice(&self.bytes[self.pos..end]);
        self.pos = end;
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for ReplayRng {}

fn reference_key() -> MasterKey {
    MasterKey::from_hex(REFERENCE_KEY).unwrap()
}

fn known_answers() -> Vec<(&'static [u8], &'static str)> {
    vec![
        (
            &b"return 1"[..],
            "000102030405060708090a0b0c0d0e0f\
             a856c6acce2afc57a922f7869a939e6291f903c33aceddf39d3cd944b80fe6d7\
             a1b49540c0b764276be658e0441670a96d7390a2f619a2793084f47b84e13594\
             a0a1a2a3a4a5a6a7\
             70f41f2d98502a93",
        ),
        (
            &b""[..],
            "000102030405060708090a0b0c0d0e0f\
             b55740cc83ee1bb16f05cc0523d67ae22b5e19b15642ddf5894c1a58cff850a0\
             e2809aeb4fb6eb8d8b8bfc2dd3fe99d0fe6625c7164987ef206783a2050b3133\
             a0a1a2a3a4a5a6a7",
        ),
        (
            &b"print('hello from the trusted side')\nreturn 42\n"[..],
            "000102030405060708090a0b0c0d0e0f\
             646cd0c906dd58d843748ec828d34a63fa19c18ce4466234c63ddddd5bc2d469\
             cfef864c8e5ccce3a2f346c98a72454abfd2bfb2f2584c50733796647b2eb734\
             a0a1a2a3a4a5a6a7\
             72e302369e162dca9277641f199ef838eb828adbd8f747f759ee14dec66ac2d5\
             9b25b743d0ff2540fb4b5221b56090",
        ),
    ]
}

#[test]
fn seal_matches_reference_packer() {
    let master = reference_key();
    for (plaintext, expected_hex) in known_answers() {
        let blob = seal_with_rng(&mut ReplayRng::reference(), &master, plaintext).unwrap();
        assert_eq!(hex::encode(&blob), expected_hex);
    }
}

#[test]
fn open_accepts_reference_packer_output() {
    let master = reference_key();
    for (plaintext, expected_hex) in known_answers() {
        let blob = hex::decode(expected_hex).unwrap();
        assert_eq!(open(&master, &blob).unwrap(), plaintext);
        assert_eq!(verify(&master, &blob).unwrap(), plaintext.len());
    }
}

#[test]
fn reference_frame_fields() {
    let (_, expected_hex) = known_answers()[0];
    let blob = hex::decode(expected_hex).unwrap();
    let frame = Frame::parse(&blob).unwrap();

    assert_eq!(hex::encode(frame.salt), "000102030405060708090a0b0c0d0e0f");
    assert_eq!(hex::encode(frame.nonce), "a0a1a2a3a4a5a6a7");
    assert_eq!(frame.payload_len(), 8);
}

#[test]
fn wrong_key_rejected_for_reference_blob() {
    let (_, expected_hex) = known_answers()[0];
    let blob = hex::decode(expected_hex).unwrap();

    let mut key = reference_key().as_bytes().to_vec();
    key[0] ^= 0x80;
    let wrong = MasterKey::from_bytes(key).unwrap();

    assert_eq!(open(&wrong, &blob).unwrap_err(), SealError::Authentication);
}

fn master_key_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 1..=64)
}

proptest! {
    #[test]
    fn roundtrip(
        key in master_key_strategy(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..=2048),
    ) {
        let master = MasterKey::from_bytes(key).unwrap();
        let blob = seal(&master, &plaintext).unwrap();
        prop_assert_eq!(open(&master, &blob).unwrap(), plaintext);
    }

    #[test]
    fn sealed_length_is_overhead_plus_payload(
        plaintext in proptest::collection::vec(any::<u8>(), 0..=2048),
    ) {
        let master = reference_key();
        let blob = seal(&master, &plaintext).unwrap();
        prop_assert_eq!(blob.len(), OVERHEAD + plaintext.len());
    }

    #[test]
    fn single_byte_tamper_rejected(
        plaintext in proptest::collection::vec(any::<u8>(), 0..=256),
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let master = reference_key();
        let mut blob = seal(&master, &plaintext).unwrap();
        let at = index.index(blob.len());
        blob[at] ^= mask;

        prop_assert_eq!(open(&master, &blob).unwrap_err(), SealError::Authentication);
    }

    #[test]
    fn distinct_keys_rejected(
        key_a in master_key_strategy(),
        key_b in master_key_strategy(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..=256),
    ) {
        prop_assume!(key_a != key_b);
        let sealer = MasterKey::from_bytes(key_a).unwrap();
        let opener = MasterKey::from_bytes(key_b).unwrap();

        let blob = seal(&sealer, &plaintext).unwrap();
        prop_assert_eq!(open(&opener, &blob).unwrap_err(), SealError::Authentication);
    }

    #[test]
    fn short_blobs_are_format_errors(blob in proptest::collection::vec(any::<u8>(), 0..OVERHEAD)) {
        let master = reference_key();
        let len = blob.len();
        prop_assert_eq!(open(&master, &blob).unwrap_err(), SealError::Format { len });
    }
}
