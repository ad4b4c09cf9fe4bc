//! OS keyring-backed key protection.
//!
//! A random 32-byte wrapping key is stored in the operating system's
//! per-user credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (persisted across reboots), with the kernel
//!   keyring as a per-boot cache in front of it
//!
//! The escrowed vault key is AES-256-GCM-sealed under that wrapping key,
//! so the file on disk can only be opened by the same OS user on the
//! same machine.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroizing;

use super::KeyProtector;
use crate::crypto::encryption::{decrypt_with_aad, encrypt_with_aad};
use crate::crypto::KEY_LEN;
use crate::errors::{Result, VaultError};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "absconditus";

/// Associated data binding sealed keys to this purpose.
const ESCROW_AAD: &[u8] = b"absconditus-escrow-v1";

/// Wraps escrowed keys with a credential held in the OS keyring.
#[derive(Debug, Clone)]
pub struct KeyringProtector {
    account: String,
}

impl KeyringProtector {
    /// One keyring entry per data directory, so two installations for the
    /// same user do not share a wrapping key.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            account: format!("escrow:{}", data_dir.display()),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(SERVICE_NAME, &self.account)
            .map_err(|e| VaultError::EscrowError(format!("failed to create keyring entry: {e}")))
    }

    /// Fetch the wrapping key, or `None` if none was ever stored.
    fn load_wrapping_key(&self) -> Result<Option<Zeroizing<Vec<u8>>>> {
        match self.entry()?.get_password() {
            Ok(encoded) => {
                let encoded = Zeroizing::new(encoded);
                let bytes = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                    VaultError::EscrowError(format!("wrapping key is not base64: {e}"))
                })?;
                Ok(Some(Zeroizing::new(bytes)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(VaultError::EscrowError(format!(
                "failed to read from keyring: {e}"
            ))),
        }
    }

    fn load_or_create_wrapping_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        if let Some(key) = self.load_wrapping_key()? {
            return Ok(key);
        }

        let mut key = Zeroizing::new(vec![0u8; KEY_LEN]);
        rand::rngs::OsRng.fill_bytes(key.as_mut_slice());

        let encoded = Zeroizing::new(BASE64.encode(key.as_slice()));
        self.entry()?.set_password(&encoded).map_err(|e| {
            VaultError::EscrowError(format!("failed to store wrapping key in keyring: {e}"))
        })?;

        Ok(key)
    }
}

impl KeyProtector for KeyringProtector {
    fn protect(&self, secret: &[u8]) -> Result<Vec<u8>> {
        let wrapping_key = self.load_or_create_wrapping_key()?;
        encrypt_with_aad(&wrapping_key, secret, ESCROW_AAD)
    }

    fn unprotect(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let wrapping_key = self
            .load_wrapping_key()?
            .ok_or_else(|| VaultError::EscrowError("no wrapping key in keyring".into()))?;

        decrypt_with_aad(&wrapping_key, sealed, ESCROW_AAD)
            .map(Zeroizing::new)
            .map_err(|_| VaultError::EscrowError("escrowed key failed authentication".into()))
    }

    fn forget(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine.
            Err(e) => Err(VaultError::EscrowError(format!(
                "failed to delete from keyring: {e}"
            ))),
        }
    }
}
