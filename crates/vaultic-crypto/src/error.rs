use thiserror::Error;

/// Errors from cryptographic operations.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key")]
    InvalidKey,
    #[error("Error while decrypting ciphertext")]
    KeyDecrypt,
    #[error("The ciphertext has an invalid length")]
    InvalidLength,
    #[error("Invalid password-protected key envelope")]
    InvalidKeyEnvelope,
    #[error("Rsa error, {0}")]
    Rsa(#[from] rsa::Error),
}

pub(crate) type Result<T, E = CryptoError> = std::result::Result<T, E>;
