use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    // Derivation errors
    EntropyUnavailable(String),
    InvalidChecksum,
    InvalidMnemonic(String),
    CryptoError(String),

    // Encoding errors
    UnknownVariant { chain: String, variant: String },
    InvalidAddress(String),

    // Storage errors
    StoreError(String),
    NotFound(String),

    // Validation errors
    ValidationError(String),

    // Generic errors
    Unknown(String),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletError::EntropyUnavailable(msg) => write!(f, "Entropy unavailable: {}", msg),
            WalletError::InvalidChecksum => write!(f, "Checksum verification failed"),
            WalletError::InvalidMnemonic(msg) => write!(f, "Invalid mnemonic: {}", msg),
            WalletError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),

            WalletError::UnknownVariant { chain, variant } => {
                write!(f, "Unknown address variant: {}:{}", chain, variant)
            }
            WalletError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),

            WalletError::StoreError(msg) => write!(f, "Storage error: {}", msg),
            WalletError::NotFound(msg) => write!(f, "Not found: {}", msg),

            WalletError::ValidationError(msg) => write!(f, "Validation error: {}", msg),

            WalletError::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

pub type WalletResult<T> = Result<T, WalletError>;

impl WalletError {
    /// Whether the error came from the persistence layer rather than derivation.
    pub fn is_storage(&self) -> bool {
        matches!(self, WalletError::StoreError(_) | WalletError::NotFound(_))
    }
}

// Conversion helpers
// Read paths that may find nothing handle `ErrorKind::NotFound` before `?`.
impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        WalletError::StoreError(error.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::StoreError(format!("JSON error: {}", error))
    }
}

impl From<bip39::Error> for WalletError {
    fn from(error: bip39::Error) -> Self {
        match error {
            bip39::Error::InvalidChecksum => WalletError::InvalidChecksum,
            other => WalletError::InvalidMnemonic(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_store_errors() {
        for kind in [
            std::io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::AlreadyExists,
        ] {
            let err = WalletError::from(std::io::Error::new(kind, "write failed"));
            assert!(matches!(err, WalletError::StoreError(_)), "{kind:?}");
            assert!(err.is_storage());
        }
    }

    #[test]
    fn bip39_checksum_maps_to_invalid_checksum() {
        assert_eq!(
            WalletError::from(bip39::Error::InvalidChecksum),
            WalletError::InvalidChecksum
        );
        assert!(matches!(
            WalletError::from(bip39::Error::BadWordCount(5)),
            WalletError::InvalidMnemonic(_)
        ));
    }
}
