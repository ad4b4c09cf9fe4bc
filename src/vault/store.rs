//! On-disk custody of the vault blob.
//!
//! `VaultFile` wraps the blob path and the format layer so that the
//! session can work with `load(key)` / `save(records, key)` calls.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::format;
use super::record::Records;
use crate::crypto::DerivedKey;
use crate::errors::{Result, VaultError};

/// Handle to the `passwords.dat` file.
#[derive(Debug, Clone)]
pub struct VaultFile {
    path: PathBuf,
}

impl VaultFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the blob on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if a blob has been written.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the raw blob.  An absent file reads as an empty blob.
    pub fn read(&self) -> Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the raw blob **atomically**.
    ///
    /// 1. Write to a temp file in the same directory and flush it to disk.
    /// 2. Rename the temp file over the target path.
    ///
    /// If either step fails the previous blob is left untouched.
    pub fn write(&self, blob: &[u8]) -> Result<()> {
        write_atomic(&self.path, blob).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to persist vault");
            VaultError::from(e)
        })
    }

    /// Read and decrypt the record set.
    pub fn load(&self, key: &DerivedKey) -> Result<Records> {
        let blob = self.read()?;
        format::decode(&blob, key)
    }

    /// Encrypt and persist the full record set.
    pub fn save(&self, records: &Records, key: &DerivedKey) -> Result<()> {
        let blob = format::encode(records, key)?;
        self.write(&blob)
    }
}

/// Write `bytes` to `path` via a synced temp file and a rename.
///
/// Readers never observe a half-written file, and a failure leaves the
/// previous contents in place.  The file is owner-only on Unix.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    let result = write_synced(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.sync_all()
}
