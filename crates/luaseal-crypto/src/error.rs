use thiserror::Error;

use crate::OVERHEAD;

/// Failure outcomes of key derivation, sealing and opening.
///
/// None of these are transient: retrying with the same inputs yields the
/// same error. Messages never include key material or tag bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SealError {
    /// A derivation input was malformed (empty master key, wrong salt length,
    /// undecodable key text).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The blob cannot contain a complete frame.
    #[error("blob too short: {len} bytes (minimum {})", OVERHEAD)]
    Format { len: usize },

    /// Tag verification failed. Carries no detail by construction.
    #[error("authentication failed")]
    Authentication,
}

impl SealError {
    /// `true` for the security-relevant tag mismatch outcome.
    pub fn is_authentication(&self) -> bool {
        matches!(self, SealError::Authentication)
    }
}
