//! Cryptographic primitives for Absconditus.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - PBKDF2-HMAC-SHA256 password-based key derivation (`kdf`)
//! - The zeroizing `DerivedKey` wrapper (`keys`)
//! - Installation salt management (`salt`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod salt;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt_with_aad, derive_key, ...};
pub use encryption::{decrypt_with_aad, encrypt_with_aad};
pub use kdf::{derive_key, derive_key_with_params, KdfParams, MIN_ITERATIONS};
pub use keys::{DerivedKey, KEY_LEN};
pub use salt::{generate_salt, load_or_create_salt, SALT_LEN};
