use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::errors::{WalletError, WalletResult};

/// Manages filesystem paths used by the record store.
#[derive(Debug, Clone)]
pub struct StorePaths {
    /// Root directory for wallet data.
    root_dir: PathBuf,
    /// One file per identity.
    records_dir: PathBuf,
    /// Directory for record backups taken before destructive replacement.
    backup_dir: PathBuf,
    /// Path to persisted wallet configuration.
    config_file: PathBuf,
}

impl StorePaths {
    /// Extension of live record files.
    pub const RECORD_EXTENSION: &'static str = "record.json";
    /// Backup file extension appended to timestamped backups.
    pub const BACKUP_EXTENSION: &'static str = "record.bak";

    /// Create a new path manager rooted at the provided directory.
    pub fn new(root: impl AsRef<Path>) -> WalletResult<Self> {
        let root_dir = root.as_ref().to_path_buf();
        if root_dir.as_os_str().is_empty() {
            return Err(WalletError::StoreError(
                "Wallet root directory cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            records_dir: root_dir.join("records"),
            backup_dir: root_dir.join("backups"),
            config_file: root_dir.join("wallet.config"),
            root_dir,
        })
    }

    /// Ensure the directory structure exists, creating missing folders.
    /// `records/` and `backups/` hold plaintext key material and are
    /// restricted to the owner.
    pub fn ensure_directories(&self) -> WalletResult<()> {
        private_dir_builder().create(&self.root_dir)?;
        create_private_dir(&self.records_dir)?;
        create_private_dir(&self.backup_dir)?;
        Ok(())
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// File name stem for an identity: hex BLAKE3 of the identity string, so
    /// arbitrary identities map to distinct, filesystem-safe names.
    pub fn record_stem(identity: &str) -> String {
        blake3::hash(identity.as_bytes()).to_hex().to_string()
    }

    pub fn record_file(&self, identity: &str) -> PathBuf {
        self.records_dir.join(format!(
            "{}.{}",
            Self::record_stem(identity),
            Self::RECORD_EXTENSION
        ))
    }

    /// Copy the identity's current record into the backup directory.
    /// Returns `None` when there is no record to back up.
    pub fn create_record_backup(&self, identity: &str) -> WalletResult<Option<PathBuf>> {
        let record_file = self.record_file(identity);
        if !record_file.exists() {
            return Ok(None);
        }

        create_private_dir(&self.backup_dir)?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%6f");
        let backup_filename = format!(
            "{}_{}.{}",
            Self::record_stem(identity),
            timestamp,
            Self::BACKUP_EXTENSION
        );
        let backup_path = self.backup_dir.join(backup_filename);

        fs::copy(&record_file, &backup_path)?;
        restrict_permissions(&backup_path, PRIVATE_FILE_MODE)?;

        // Verify backup was created and has same size as original
        let original_size = fs::metadata(&record_file)?.len();
        let backup_size = fs::metadata(&backup_path)?.len();
        if original_size != backup_size {
            fs::remove_file(&backup_path)?;
            return Err(WalletError::StoreError(
                "Backup verification failed: size mismatch".to_string(),
            ));
        }

        Ok(Some(backup_path))
    }

    /// List backups for one identity, newest first.
    pub fn list_backups(&self, identity: &str) -> WalletResult<Vec<PathBuf>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let prefix = format!("{}_", Self::record_stem(identity));
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.backup_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(&prefix) && name.ends_with(Self::BACKUP_EXTENSION))
                .unwrap_or(false);
            if matches {
                backups.push(path);
            }
        }

        // Timestamped names sort chronologically.
        backups.sort();
        backups.reverse();
        Ok(backups)
    }

    /// Delete old backups of an identity, keeping only the N most recent.
    pub fn prune_old_backups(&self, identity: &str, keep_count: usize) -> WalletResult<usize> {
        let backups = self.list_backups(identity)?;
        let mut deleted_count = 0;

        for backup_path in backups.iter().skip(keep_count) {
            fs::remove_file(backup_path)?;
            deleted_count += 1;
        }

        Ok(deleted_count)
    }
}

pub(crate) const PRIVATE_DIR_MODE: u32 = 0o700;
pub(crate) const PRIVATE_FILE_MODE: u32 = 0o600;

fn private_dir_builder() -> fs::DirBuilder {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(PRIVATE_DIR_MODE);
    }
    builder
}

/// Create `dir` if missing and make it accessible to the owner only.
pub(crate) fn create_private_dir(dir: &Path) -> WalletResult<()> {
    private_dir_builder().create(dir)?;
    restrict_permissions(dir, PRIVATE_DIR_MODE)
}

/// Set unix permission bits on `path`. No-op on other platforms.
pub(crate) fn restrict_permissions(path: &Path, mode: u32) -> WalletResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}
