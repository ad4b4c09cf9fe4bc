use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Absconditus.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Salt file {0} is corrupt: expected {1} bytes")]
    InvalidSalt(PathBuf, usize),

    // --- Vault errors ---
    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("Master password is required")]
    MissingPassword,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Session / access errors ---
    #[error("Vault is locked")]
    VaultLocked,

    #[error("Unauthorized")]
    Unauthorized,

    // --- Escrow errors ---
    #[error("Key escrow error: {0}")]
    EscrowError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- Server errors ---
    #[error("Server error: {0}")]
    ServerError(String),
}

/// Coarse classification used by callers that only care about the
/// outcome class, not the exact failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed request fields.
    Input,
    /// Wrong master password.
    Auth,
    /// Missing, garbled or stale bearer token.
    Unauthorized,
    /// Token presented while the vault is locked.
    Locked,
    /// OS key protection unavailable or failed.
    EscrowUnavailable,
    /// Disk I/O, encoding, configuration and everything else.
    Persistence,
}

impl VaultError {
    /// Map this error onto its [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingPassword | Self::InvalidInput(_) => ErrorKind::Input,
            Self::DecryptionFailed => ErrorKind::Auth,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::VaultLocked => ErrorKind::Locked,
            Self::EscrowError(_) => ErrorKind::EscrowUnavailable,
            _ => ErrorKind::Persistence,
        }
    }
}

/// Convenience type alias for Absconditus results.
pub type Result<T> = std::result::Result<T, VaultError>;
