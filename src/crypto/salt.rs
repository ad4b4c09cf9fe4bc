//! Installation salt: 16 random bytes, created once and never rewritten.

use std::fs;
use std::path::Path;

use rand::RngCore;

use crate::errors::{Result, VaultError};
use crate::vault::store::write_atomic;

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Read the salt at `path`, creating it on first use.
///
/// The file is written atomically with owner-only permissions on Unix, so
/// a crash mid-write never leaves a truncated salt behind.  An existing
/// file of the wrong length is an error rather than a silent re-salt,
/// since a new salt would make every existing vault unreadable.
pub fn load_or_create_salt(path: &Path) -> Result<[u8; SALT_LEN]> {
    if path.exists() {
        let data = fs::read(path)?;
        return data
            .as_slice()
            .try_into()
            .map_err(|_| VaultError::InvalidSalt(path.to_path_buf(), SALT_LEN));
    }

    let salt = generate_salt();
    write_atomic(path, &salt)?;

    tracing::info!(path = %path.display(), "Created new installation salt");
    Ok(salt)
}
