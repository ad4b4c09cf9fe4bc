//! The vault session: the process-wide lock/unlock state machine.
//!
//! ```text
//!            unlock(ok) / auto-unlock
//!   Locked ───────────────────────────▶ Unlocked(key, token)
//!     ▲                                      │
//!     └──── lock() / unlock(failed) ─────────┘
//! ```
//!
//! A single `parking_lot::Mutex` serializes every transition together
//! with every read-modify-write of the vault blob.  Only key derivation
//! runs outside it: it is pure and slow, and holding the lock through it
//! would stall status checks for half a second.
//!
//! Everything here blocks.  Async callers go through `spawn_blocking`.

mod token;

pub use token::{AccessToken, TOKEN_LEN};

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::Settings;
use crate::crypto::kdf::{derive_key_with_params, KdfParams};
use crate::crypto::salt::{load_or_create_salt, SALT_LEN};
use crate::crypto::DerivedKey;
use crate::escrow::{self, KeyEscrow};
use crate::errors::{Result, VaultError};
use crate::vault::VaultFile;

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultStatus {
    Locked,
    Unlocked,
}

impl VaultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        }
    }
}

#[derive(Debug)]
enum SessionState {
    Locked,
    Unlocked { key: DerivedKey, token: AccessToken },
}

/// Owner of the derived key and the current access token.
///
/// Share it behind an `Arc`; all methods take `&self`.
#[derive(Debug)]
pub struct VaultSession {
    state: Mutex<SessionState>,
    vault: VaultFile,
    salt: [u8; SALT_LEN],
    kdf: KdfParams,
    escrow: Box<dyn KeyEscrow>,
}

impl VaultSession {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open the session for the installation described by `settings`,
    /// with the escrow selected for this platform.
    ///
    /// Creates the salt on first run.  Always starts `Locked`; call
    /// [`auto_unlock_on_startup`](Self::auto_unlock_on_startup) next.
    pub fn open(settings: &Settings) -> Result<Self> {
        Self::with_escrow(settings, escrow::from_settings(settings))
    }

    /// Like [`open`](Self::open) with an explicit escrow implementation.
    pub fn with_escrow(settings: &Settings, escrow: Box<dyn KeyEscrow>) -> Result<Self> {
        settings.validate()?;
        let salt = load_or_create_salt(&settings.salt_path())?;

        Ok(Self {
            state: Mutex::new(SessionState::Locked),
            vault: VaultFile::new(settings.vault_path()),
            salt,
            kdf: settings.kdf_params(),
            escrow,
        })
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Unlock with the master password.
    ///
    /// The derived key is accepted only if it authenticates the current
    /// blob (an absent blob accepts any key).  On success a new token is
    /// minted and the key is escrowed.  On failure the session ends up
    /// `Locked` with no token, whatever it was before.
    pub fn unlock(&self, password: &str) -> Result<()> {
        if password.is_empty() {
            *self.state.lock() = SessionState::Locked;
            return Err(VaultError::MissingPassword);
        }

        let key = derive_key_with_params(password.as_bytes(), &self.salt, &self.kdf)?;

        let mut state = self.state.lock();
        match self.vault.load(&key) {
            Ok(records) => {
                if let Err(e) = self.escrow.escrow(&key) {
                    tracing::warn!(error = %e, "Could not escrow key; auto-unlock unavailable");
                }
                *state = SessionState::Unlocked {
                    key,
                    token: AccessToken::generate(),
                };
                tracing::info!(records = records.len(), "Vault unlocked");
                Ok(())
            }
            Err(e) => {
                *state = SessionState::Locked;
                tracing::warn!(error = %e, "Unlock rejected");
                Err(e)
            }
        }
    }

    /// Lock the vault: forget the key and token, and delete the escrowed
    /// key so the next start stays locked.  Idempotent.
    pub fn lock(&self) -> Result<()> {
        let mut state = self.state.lock();
        let was_unlocked = matches!(*state, SessionState::Unlocked { .. });
        *state = SessionState::Locked;

        self.escrow.discard()?;

        if was_unlocked {
            tracing::info!("Vault locked");
        }
        Ok(())
    }

    /// Try to unlock from the escrowed key.  Returns whether the session
    /// is now unlocked.
    ///
    /// The recovered key must still authenticate the current blob.  A key
    /// that no longer matches (the blob was replaced) is discarded and the
    /// vault waits for the master password.
    pub fn auto_unlock_on_startup(&self) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, SessionState::Unlocked { .. }) {
            return true;
        }

        let Some(key) = self.escrow.recover() else {
            if self.escrow.is_supported() {
                tracing::info!("No escrowed key recovered; vault stays locked");
            }
            return false;
        };

        match self.vault.load(&key) {
            Ok(_) => {
                *state = SessionState::Unlocked {
                    key,
                    token: AccessToken::generate(),
                };
                tracing::info!("Vault unlocked automatically from escrowed key");
                true
            }
            Err(VaultError::DecryptionFailed) => {
                tracing::warn!("Escrowed key does not open the vault; discarding it");
                if let Err(e) = self.escrow.discard() {
                    tracing::warn!(error = %e, "Could not discard stale escrowed key");
                }
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot verify escrowed key; vault stays locked");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current state, without side effects.
    pub fn status(&self) -> VaultStatus {
        match *self.state.lock() {
            SessionState::Locked => VaultStatus::Locked,
            SessionState::Unlocked { .. } => VaultStatus::Unlocked,
        }
    }

    /// The current access token, or `VaultLocked`.
    pub fn request_token(&self) -> Result<AccessToken> {
        match &*self.state.lock() {
            SessionState::Unlocked { token, .. } => Ok(token.clone()),
            SessionState::Locked => Err(VaultError::VaultLocked),
        }
    }

    /// Returns the vault file this session guards.
    pub fn vault(&self) -> &VaultFile {
        &self.vault
    }

    // ------------------------------------------------------------------
    // Authorized access
    // ------------------------------------------------------------------

    /// Run `op` with the in-memory key if `presented` is the current token.
    ///
    /// The session lock is held for the whole of `op`, making any
    /// load-modify-save it performs a single critical section.
    pub(crate) fn with_key<T>(
        &self,
        presented: &str,
        op: impl FnOnce(&VaultFile, &DerivedKey) -> Result<T>,
    ) -> Result<T> {
        let state = self.state.lock();
        match &*state {
            SessionState::Unlocked { key, token } if token.matches(presented) => {
                op(&self.vault, key)
            }
            SessionState::Unlocked { .. } => Err(VaultError::Unauthorized),
            SessionState::Locked => Err(VaultError::VaultLocked),
        }
    }
}
