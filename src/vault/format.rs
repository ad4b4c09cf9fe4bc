//! Binary vault blob format.
//!
//! A `passwords.dat` file has this layout:
//!
//! ```text
//! [ABSC: 4 bytes][version: 1 byte][nonce: 12 bytes][AES-256-GCM ciphertext + tag: 16 bytes]
//! ```
//!
//! - **Magic** (`ABSC`): identifies the file as an Absconditus vault.
//! - **Version**: format version (currently `1`).
//! - The 5-byte prefix is passed to the cipher as associated data, so
//!   rewriting it is caught by the tag check like any other tampering.
//! - The plaintext is the JSON object `{ "name": "secret", ... }`.
//!
//! An empty blob decodes to an empty record set: a vault that has never
//! been saved is valid and unlocks with any password.

use zeroize::Zeroizing;

use super::record::Records;
use crate::crypto::encryption::{decrypt_with_aad, encrypt_with_aad, NONCE_LEN, TAG_LEN};
use crate::crypto::DerivedKey;
use crate::errors::{Result, VaultError};

/// Magic bytes at the start of every vault blob.
const MAGIC: &[u8; 4] = b"ABSC";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version).
const PREFIX_LEN: usize = 5;

/// Encrypt the full record set into a vault blob.
///
/// Every call uses a fresh nonce, so encoding the same records twice
/// produces different bytes.
pub fn encode(records: &Records, key: &DerivedKey) -> Result<Vec<u8>> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(records)
            .map_err(|e| VaultError::SerializationError(format!("records: {e}")))?,
    );

    let prefix = prefix();
    let sealed = encrypt_with_aad(key.as_bytes(), &plaintext, &prefix)?;

    let mut blob = Vec::with_capacity(PREFIX_LEN + sealed.len());
    blob.extend_from_slice(&prefix);
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Decrypt a vault blob back into the record set.
///
/// Returns an empty map for an empty blob.  A wrong key or any
/// modification of the blob fails with `DecryptionFailed`.
pub fn decode(blob: &[u8], key: &DerivedKey) -> Result<Records> {
    if blob.is_empty() {
        return Ok(Records::new());
    }

    if blob.len() < PREFIX_LEN + NONCE_LEN + TAG_LEN {
        return Err(VaultError::InvalidVaultFormat(
            "file too small to be a valid vault".into(),
        ));
    }

    let (prefix, sealed) = blob.split_at(PREFIX_LEN);

    if &prefix[0..4] != MAGIC {
        return Err(VaultError::InvalidVaultFormat(
            "missing ABSC magic bytes".into(),
        ));
    }

    let version = prefix[4];
    if version != CURRENT_VERSION {
        return Err(VaultError::InvalidVaultFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let plaintext = Zeroizing::new(decrypt_with_aad(key.as_bytes(), sealed, prefix)?);

    serde_json::from_slice(&plaintext)
        .map_err(|e| VaultError::InvalidVaultFormat(format!("records JSON: {e}")))
}

fn prefix() -> [u8; PREFIX_LEN] {
    let mut prefix = [0u8; PREFIX_LEN];
    prefix[..4].copy_from_slice(MAGIC);
    prefix[4] = CURRENT_VERSION;
    prefix
}
