//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The work factor is a fixed, deliberately high iteration count so that
//! offline brute force of the master password stays expensive.  There is
//! no stored password hash: a wrong password simply yields a key that the
//! store codec refuses to authenticate.

use sha2::Sha256;

use super::keys::{DerivedKey, KEY_LEN};
use crate::errors::{Result, VaultError};

/// Minimum (and default) PBKDF2 iteration count.
pub const MIN_ITERATIONS: u32 = 480_000;

/// PBKDF2 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Number of HMAC-SHA256 rounds (default: 480 000).
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: MIN_ITERATIONS,
        }
    }
}

/// Derive a 32-byte key from a master password and salt with default params.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<DerivedKey> {
    derive_key_with_params(password, salt, &KdfParams::default())
}

/// Derive a 32-byte key with explicit PBKDF2 parameters.
///
/// The same password + salt + params will always produce the same key.
/// Iteration counts below [`MIN_ITERATIONS`] are rejected.
pub fn derive_key_with_params(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<DerivedKey> {
    if params.iterations < MIN_ITERATIONS {
        return Err(VaultError::KeyDerivationFailed(format!(
            "PBKDF2 iterations must be at least {MIN_ITERATIONS} (got {})",
            params.iterations
        )));
    }
    if salt.is_empty() {
        return Err(VaultError::KeyDerivationFailed("salt cannot be empty".into()));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, params.iterations, &mut key);
    Ok(DerivedKey::from_array(key))
}
