//! ECIES secure-channel boundary.
//!
//! The secure world exposes an elliptic-curve key agreement followed by
//! symmetric encryption. Its context lives in the same secure memory the
//! fault handler diagnoses, so the interface is declared here; no cipher is
//! implemented in this crate.

use thiserror_no_std::Error;

/// Failure reported by an [`EciesCipher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CipherError {
    /// The output buffer cannot hold the result.
    #[error("output buffer too small: need {needed} bytes, have {capacity}")]
    OutputTooSmall {
        /// Bytes the operation would write.
        needed: usize,
        /// Bytes available.
        capacity: usize,
    },
    /// Shared secret could not be derived from the context.
    #[error("key agreement failed")]
    KeyAgreement,
    /// Ciphertext failed its integrity check.
    #[error("ciphertext authentication failed")]
    Authentication,
    /// Any other non-zero status from the backend.
    #[error("cipher backend returned status {0}")]
    Backend(i32),
}

impl CipherError {
    /// Status code used by C backends for a short output buffer.
    pub const STATUS_OUTPUT_TOO_SMALL: i32 = -1;
    /// Status code for a key agreement failure.
    pub const STATUS_KEY_AGREEMENT: i32 = -2;
    /// Status code for an authentication failure.
    pub const STATUS_AUTHENTICATION: i32 = -3;

    /// Map a C-style status to a result. Zero is success.
    ///
    /// `needed` and `capacity` fill in [`CipherError::OutputTooSmall`], which a
    /// bare status code cannot carry.
    pub const fn from_status(status: i32, needed: usize, capacity: usize) -> Result<(), Self> {
        match status {
            0 => Ok(()),
            Self::STATUS_OUTPUT_TOO_SMALL => Err(Self::OutputTooSmall { needed, capacity }),
            Self::STATUS_KEY_AGREEMENT => Err(Self::KeyAgreement),
            Self::STATUS_AUTHENTICATION => Err(Self::Authentication),
            other => Err(Self::Backend(other)),
        }
    }
}

/// ECIES encrypt/decrypt over a key agreement context.
pub trait EciesCipher {
    /// Key agreement state, for example an ECDH context.
    type Context;

    /// Encrypt `input` into `output` and return the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`CipherError::OutputTooSmall`] if `output` is too short, or any
    /// backend failure.
    fn encrypt(
        &mut self,
        ctx: &mut Self::Context,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, CipherError>;

    /// Decrypt `input` into `output` and return the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`CipherError::Authentication`] if the ciphertext does not verify, or
    /// any error [`EciesCipher::encrypt`] can return.
    fn decrypt(
        &mut self,
        ctx: &mut Self::Context,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, CipherError>;
}
