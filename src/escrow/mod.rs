//! Key escrow for auto-unlock across restarts.
//!
//! After a successful unlock the derived key can be wrapped with an
//! OS-scoped protection primitive and written to `key.protected`.  On the
//! next start the session asks the escrow for the key back; if that works
//! the vault unlocks without the master password.
//!
//! The OS credential store is the root of trust: the wrapped file is
//! useless on another machine or under another OS user.  On builds or
//! platforms without such a primitive, [`NoEscrow`] is selected and the
//! vault always waits for a manual unlock.
//!
//! Recovery never fails loudly.  A missing file, a corrupt file, or an
//! unavailable credential store all mean "no key", logged at `warn`.

#[cfg(feature = "keyring-store")]
mod os_keyring;

#[cfg(feature = "keyring-store")]
pub use self::os_keyring::KeyringProtector;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::DerivedKey;
use crate::errors::{Result, VaultError};
use crate::vault::store::write_atomic;

/// Capability interface for persisting and recovering the derived key.
pub trait KeyEscrow: fmt::Debug + Send + Sync {
    /// Wrap and persist `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be protected or written.
    fn escrow(&self, key: &DerivedKey) -> Result<()>;

    /// Recover a previously escrowed key.  Any failure is `None`.
    fn recover(&self) -> Option<DerivedKey>;

    /// Delete the escrowed key so the next start stays locked.
    ///
    /// # Errors
    ///
    /// Returns an error if the escrow file exists but cannot be removed.
    fn discard(&self) -> Result<()>;

    /// Whether this escrow can ever return a key.
    fn is_supported(&self) -> bool {
        true
    }
}

/// Escrow for platforms without a per-user protection primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEscrow;

impl KeyEscrow for NoEscrow {
    fn escrow(&self, _key: &DerivedKey) -> Result<()> {
        Ok(())
    }

    fn recover(&self) -> Option<DerivedKey> {
        None
    }

    fn discard(&self) -> Result<()> {
        Ok(())
    }

    fn is_supported(&self) -> bool {
        false
    }
}

/// An OS-backed primitive that seals bytes to the current user.
pub trait KeyProtector: fmt::Debug + Send + Sync {
    /// Seal `secret` so only this OS user can open it.
    ///
    /// # Errors
    ///
    /// Returns an error if the primitive is unavailable.
    fn protect(&self, secret: &[u8]) -> Result<Vec<u8>>;

    /// Open bytes produced by `protect`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are corrupt or belong to someone else.
    fn unprotect(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>>;

    /// Drop any OS-side material tied to previously sealed bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store rejects the deletion.
    fn forget(&self) -> Result<()> {
        Ok(())
    }
}

/// Escrow that keeps the protected key in a file.
#[derive(Debug)]
pub struct FileEscrow<P: KeyProtector> {
    path: PathBuf,
    protector: P,
}

impl<P: KeyProtector> FileEscrow<P> {
    pub fn new(path: impl Into<PathBuf>, protector: P) -> Self {
        Self {
            path: path.into(),
            protector,
        }
    }

    /// Returns the path of the escrowed-key file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<P: KeyProtector> KeyEscrow for FileEscrow<P> {
    fn escrow(&self, key: &DerivedKey) -> Result<()> {
        let sealed = self.protector.protect(key.as_bytes())?;
        write_atomic(&self.path, &sealed)?;
        tracing::debug!(path = %self.path.display(), "Escrowed vault key");
        Ok(())
    }

    fn recover(&self) -> Option<DerivedKey> {
        let sealed = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No escrowed key on disk");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cannot read escrowed key");
                return None;
            }
        };

        let opened = match self.protector.unprotect(&sealed) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot unprotect escrowed key");
                return None;
            }
        };

        match DerivedKey::from_slice(&opened) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(error = %e, "Escrowed key has the wrong shape");
                None
            }
        }
    }

    fn discard(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed escrowed key"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(VaultError::Io(e)),
        }

        // The file is already gone, so a stale credential cannot unlock anything.
        if let Err(e) = self.protector.forget() {
            tracing::warn!(error = %e, "Could not remove escrow credential");
        }
        Ok(())
    }
}

/// The escrow for this build and platform, ignoring `auto_unlock`.
///
/// Used by `forget`, which must clean up even when auto-unlock has since
/// been switched off.
pub fn platform(settings: &Settings) -> Box<dyn KeyEscrow> {
    #[cfg(feature = "keyring-store")]
    {
        Box::new(FileEscrow::new(
            settings.escrow_path(),
            KeyringProtector::for_data_dir(&settings.data_dir),
        ))
    }

    #[cfg(not(feature = "keyring-store"))]
    {
        let _ = settings;
        tracing::info!("Key escrow not compiled in; auto-unlock disabled");
        Box::new(NoEscrow)
    }
}

/// Select the escrow used by the session, once, at startup.
pub fn from_settings(settings: &Settings) -> Box<dyn KeyEscrow> {
    if settings.auto_unlock {
        platform(settings)
    } else {
        tracing::info!("Auto-unlock disabled in settings");
        Box::new(NoEscrow)
    }
}
