use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeyforgeError>;

/// Error kinds shared across the Keyforge crates.
///
/// Derivation and codec failures surface to the caller unchanged; only
/// `VaultStore::load` is allowed to swallow `VaultCorrupt`/`Io` and fall
/// back to an empty vault.
#[derive(Debug, Error)]
pub enum KeyforgeError {
    /// A length parameter is outside the supported range.
    #[error("bad length: {0}")]
    BadLength(String),

    /// AEAD open failed: wrong key, wrong nonce, or tampered data.
    #[error("authenticated decryption failed")]
    AeadFailure,

    /// The vault envelope could not be decoded. Tag mismatch, truncated
    /// framing, inflate failure, and JSON parse failure all collapse here.
    #[error("vault data is corrupt or the passphrase is wrong")]
    VaultCorrupt,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Reported by `BlobStore` backends when an upload cannot be paid for.
    #[error("insufficient funds: need {needed} {currency}, have {available}")]
    InsufficientFunds {
        needed: u64,
        available: u64,
        currency: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages_are_stable() {
        assert_eq!(
            KeyforgeError::BadLength("len 0".into()).to_string(),
            "bad length: len 0"
        );
        assert_eq!(
            KeyforgeError::AeadFailure.to_string(),
            "authenticated decryption failed"
        );
        assert_eq!(
            KeyforgeError::NotFound("password 'example.com'".into()).to_string(),
            "password 'example.com' not found"
        );
        assert_eq!(
            KeyforgeError::InsufficientFunds {
                needed: 1200,
                available: 40,
                currency: "sat".into()
            }
            .to_string(),
            "insufficient funds: need 1200 sat, have 40"
        );
    }

    #[test]
    fn test_io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: KeyforgeError = io.into();
        assert!(matches!(err, KeyforgeError::Io(_)));
    }
}
