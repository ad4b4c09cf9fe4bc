//! Access gateway: bearer-token checks in front of record operations.
//!
//! Outcomes, in the order they are decided:
//! 1. no header, not `Bearer`, or not a token-shaped value: `Unauthorized`
//! 2. session locked: `VaultLocked` (no token is valid while locked, and
//!    unlock always rotates the token, so the caller must fetch a new one)
//! 3. token differs from the current one: `Unauthorized`
//! 4. otherwise the operation runs with the in-memory key, under the
//!    session lock, as one load-modify-save unit.

use std::sync::Arc;

use crate::errors::{Result, VaultError};
use crate::session::{AccessToken, VaultSession};
use crate::crypto::DerivedKey;
use crate::vault::{validate_record, Records, VaultFile};

/// Scheme prefix of the `Authorization` header.
const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization` header value.
pub fn parse_bearer(header: Option<&str>) -> Result<&str> {
    let token = header
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .ok_or(VaultError::Unauthorized)?;

    if AccessToken::is_well_formed(token) {
        Ok(token)
    } else {
        Err(VaultError::Unauthorized)
    }
}

/// Load the records with the session key.
///
/// The key was verified at unlock, so an authentication failure here means
/// the blob was replaced on disk underneath the session: a storage fault,
/// not a wrong password.
fn load_records(vault: &VaultFile, key: &DerivedKey) -> Result<Records> {
    vault.load(key).map_err(|e| match e {
        VaultError::DecryptionFailed => {
            tracing::error!("Vault blob no longer opens with the unlocked key");
            VaultError::InvalidVaultFormat("blob changed on disk while unlocked".into())
        }
        other => other,
    })
}

/// Authorizes record operations against a shared [`VaultSession`].
#[derive(Debug, Clone)]
pub struct AccessGateway {
    session: Arc<VaultSession>,
}

impl AccessGateway {
    pub fn new(session: Arc<VaultSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<VaultSession> {
        &self.session
    }

    /// Decrypt and return every record.
    pub fn all_records(&self, authorization: Option<&str>) -> Result<Records> {
        let token = parse_bearer(authorization)?;
        self.session.with_key(token, load_records)
    }

    /// Insert or replace one record.
    ///
    /// A failed save leaves the previous blob on disk.
    pub fn upsert_record(&self, authorization: Option<&str>, name: &str, secret: &str) -> Result<()> {
        let token = parse_bearer(authorization)?;
        self.session.with_key(token, |vault, key| {
            validate_record(name, secret)?;

            let mut records = load_records(vault, key)?;
            let replaced = records.insert(name.to_string(), secret.to_string()).is_some();
            vault.save(&records, key)?;

            tracing::info!(replaced, total = records.len(), "Record saved");
            Ok(())
        })
    }

    /// Remove one record.  Removing an absent name leaves the file untouched.
    pub fn delete_record(&self, authorization: Option<&str>, name: &str) -> Result<()> {
        let token = parse_bearer(authorization)?;
        self.session.with_key(token, |vault, key| {
            if name.trim().is_empty() {
                return Err(VaultError::InvalidInput("record name cannot be empty".into()));
            }

            let mut records = load_records(vault, key)?;
            if records.remove(name).is_none() {
                tracing::debug!("Delete of absent record ignored");
                return Ok(());
            }
            vault.save(&records, key)?;

            tracing::info!(total = records.len(), "Record deleted");
            Ok(())
        })
    }
}
