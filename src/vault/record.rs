//! The decrypted record set.
//!
//! A vault holds a flat `name -> secret` mapping with unique names.
//! `BTreeMap` keeps the serialized JSON in a stable order.

use std::collections::BTreeMap;

/// All secrets in a vault, keyed by name.
pub type Records = BTreeMap<String, String>;

/// Maximum length of a record name, in bytes.
pub const MAX_NAME_LEN: usize = 1024;

/// Validate a record name and secret for an upsert.
///
/// Both must be non-empty.  Names are free-form (site names, URLs,
/// usernames) so only length is bounded.
pub fn validate_record(name: &str, secret: &str) -> crate::errors::Result<()> {
    use crate::errors::VaultError;

    if name.trim().is_empty() {
        return Err(VaultError::InvalidInput("record name cannot be empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(VaultError::InvalidInput(format!(
            "record name cannot exceed {MAX_NAME_LEN} bytes"
        )));
    }
    if secret.is_empty() {
        return Err(VaultError::InvalidInput("secret cannot be empty".into()));
    }
    Ok(())
}
