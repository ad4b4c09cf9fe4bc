use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{KdfParams, MIN_ITERATIONS};
use crate::errors::{Result, VaultError};

/// Installation-level configuration, loaded from `absconditus.toml`
/// inside the data directory.
///
/// Every field has a sensible default so Absconditus works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Address the API listens on. Must be loopback.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// TCP port of the API (the browser extension expects 5000).
    #[serde(default = "default_port")]
    pub port: u16,

    /// PBKDF2 iteration count (default and minimum: 480 000).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Escrow the derived key with the OS so restarts unlock automatically.
    #[serde(default = "default_auto_unlock")]
    pub auto_unlock: bool,

    /// Default `tracing` filter directive (`RUST_LOG` wins when set).
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Directory holding the salt, vault and escrow files.
    /// Not read from the TOML file; set by `load`.
    #[serde(skip)]
    pub data_dir: PathBuf,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    5000
}

fn default_kdf_iterations() -> u32 {
    MIN_ITERATIONS
}

fn default_auto_unlock() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            kdf_iterations: default_kdf_iterations(),
            auto_unlock: default_auto_unlock(),
            log_filter: default_log_filter(),
            data_dir: PathBuf::new(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the data directory.
    const FILE_NAME: &'static str = "absconditus.toml";

    const SALT_FILE: &'static str = "salt.key";
    const VAULT_FILE: &'static str = "passwords.dat";
    const ESCROW_FILE: &'static str = "key.protected";

    /// Defaults rooted at `data_dir`, ignoring any config file.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            ..Self::default()
        }
    }

    /// Load settings from `<data_dir>/absconditus.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed or fails validation, an
    /// error is returned.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::for_data_dir(data_dir));
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let mut settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;
        settings.data_dir = data_dir.to_path_buf();
        settings.validate()?;

        Ok(settings)
    }

    /// Reject settings that would weaken the threat model.
    pub fn validate(&self) -> Result<()> {
        if !self.bind_address.is_loopback() {
            return Err(VaultError::ConfigError(format!(
                "bind_address must be a loopback address (got {})",
                self.bind_address
            )));
        }
        if self.kdf_iterations < MIN_ITERATIONS {
            return Err(VaultError::ConfigError(format!(
                "kdf_iterations must be at least {MIN_ITERATIONS} (got {})",
                self.kdf_iterations
            )));
        }
        Ok(())
    }

    /// Path of the 16-byte installation salt.
    pub fn salt_path(&self) -> PathBuf {
        self.data_dir.join(Self::SALT_FILE)
    }

    /// Path of the encrypted vault blob.
    pub fn vault_path(&self) -> PathBuf {
        self.data_dir.join(Self::VAULT_FILE)
    }

    /// Path of the OS-protected escrowed key.
    pub fn escrow_path(&self) -> PathBuf {
        self.data_dir.join(Self::ESCROW_FILE)
    }

    /// Convert the KDF settings into crypto-layer params.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            iterations: self.kdf_iterations,
        }
    }
}

/// Per-user default data directory (`%LOCALAPPDATA%\Absconditus`,
/// `~/.local/share/Absconditus`, `~/Library/Application Support/Absconditus`).
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join("Absconditus"))
        .ok_or_else(|| {
            VaultError::ConfigError(
                "cannot determine the local data directory — pass --data-dir".into(),
            )
        })
}

// ── Tests ────────────────────────────────────────────────────────────
