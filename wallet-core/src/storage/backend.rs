use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blake3::Hasher as Blake3;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::paths::{create_private_dir, restrict_permissions, PRIVATE_FILE_MODE};
use super::record::WalletRecord;
use super::StorePaths;
use crate::errors::{WalletError, WalletResult};

const RECORD_MAGIC: &[u8; 8] = b"IDWALLET";
const RECORD_FORMAT_VERSION: u16 = 1;

/// How a save relates to what is already stored for the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// First record for the identity; fails if one exists.
    Create,
    /// Same wallet, new derived fields.
    Update,
    /// Different wallet replacing the old one.
    Replace,
}

/// Persistence medium for wallet records, one record per identity.
///
/// `save` must be atomic: after a failure the previously stored record (or its
/// absence) is what a subsequent `load` observes.
pub trait RecordBackend: Send + Sync {
    fn load(&self, identity: &str) -> WalletResult<Option<WalletRecord>>;
    fn save(&self, record: &WalletRecord, mode: WriteMode) -> WalletResult<()>;
    fn remove(&self, identity: &str) -> WalletResult<bool>;
}

impl<B: RecordBackend + ?Sized> RecordBackend for Arc<B> {
    fn load(&self, identity: &str) -> WalletResult<Option<WalletRecord>> {
        (**self).load(identity)
    }

    fn save(&self, record: &WalletRecord, mode: WriteMode) -> WalletResult<()> {
        (**self).save(record, mode)
    }

    fn remove(&self, identity: &str) -> WalletResult<bool> {
        (**self).remove(identity)
    }
}

#[derive(Serialize, Deserialize)]
struct RecordEnvelope {
    magic: [u8; 8],
    version: u16,
    checksum: [u8; 32],
    payload: WalletRecord,
}

/// Stores each identity's record as a JSON file under `records/`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    paths: StorePaths,
    backup_on_replace: bool,
    keep_backups: usize,
}

impl FileBackend {
    pub fn new(paths: StorePaths) -> Self {
        Self {
            paths,
            backup_on_replace: false,
            keep_backups: 5,
        }
    }

    /// Snapshot the previous record into `backups/` before it is replaced,
    /// retaining at most `keep` snapshots per identity.
    pub fn with_backups(mut self, enabled: bool, keep: usize) -> Self {
        self.backup_on_replace = enabled;
        self.keep_backups = keep;
        self
    }

    pub fn backups(&self, identity: &str) -> WalletResult<Vec<PathBuf>> {
        self.paths.list_backups(identity)
    }

    /// Delete all but the `keep` newest backups of `identity`.
    pub fn prune_backups(&self, identity: &str, keep: usize) -> WalletResult<usize> {
        let removed = self.paths.prune_old_backups(identity, keep)?;
        if removed > 0 {
            tracing::debug!(identity, removed, "pruned wallet record backups");
        }
        Ok(removed)
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn record_path(&self, identity: &str) -> PathBuf {
        self.paths.record_file(identity)
    }

    fn read_envelope(&self, bytes: &[u8]) -> WalletResult<RecordEnvelope> {
        let envelope: RecordEnvelope = serde_json::from_slice(bytes)?;

        if &envelope.magic != RECORD_MAGIC {
            return Err(WalletError::StoreError(
                "Invalid record magic marker".to_string(),
            ));
        }
        if envelope.version != RECORD_FORMAT_VERSION {
            return Err(WalletError::StoreError(format!(
                "Unsupported record format version: {}",
                envelope.version
            )));
        }
        if record_checksum(&envelope.payload)? != envelope.checksum {
            return Err(WalletError::StoreError(
                "Record integrity verification failed".to_string(),
            ));
        }
        Ok(envelope)
    }

    /// Write `contents` to a uniquely named owner-only file next to `path`,
    /// flushed to disk before it is published.
    fn write_staged(&self, path: &Path, contents: &[u8]) -> WalletResult<NamedTempFile> {
        let dir = self.paths.records_dir();
        create_private_dir(dir)?;

        let stem = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| WalletError::StoreError("Invalid record path".to_string()))?;
        let mut staged = tempfile::Builder::new()
            .prefix(&format!(".{stem}."))
            .suffix(".tmp")
            .tempfile_in(dir)?;
        restrict_permissions(staged.path(), PRIVATE_FILE_MODE)?;

        staged.write_all(contents)?;
        staged.as_file().sync_all()?;
        Ok(staged)
    }
}

impl RecordBackend for FileBackend {
    fn load(&self, identity: &str) -> WalletResult<Option<WalletRecord>> {
        let path = self.record_path(identity);
        let bytes = match fs::read(&path) {
            Ok(bytes) => zeroize::Zeroizing::new(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let envelope = self.read_envelope(&bytes)?;
        if envelope.payload.identity != identity {
            return Err(WalletError::StoreError(format!(
                "Record at {} belongs to a different identity",
                path.display()
            )));
        }
        Ok(Some(envelope.payload))
    }

    /// `Create` publishes with a no-clobber link, so of two writers racing for
    /// the same identity (even from separate stores or processes) exactly one
    /// succeeds. `Update` and `Replace` rename over the previous file.
    fn save(&self, record: &WalletRecord, mode: WriteMode) -> WalletResult<()> {
        let path = self.record_path(&record.identity);
        match mode {
            WriteMode::Create if path.exists() => return Err(already_exists(&path)),
            WriteMode::Replace if self.backup_on_replace => {
                if let Some(backup) = self.paths.create_record_backup(&record.identity)? {
                    tracing::info!(backup = %backup.display(), "backed up replaced wallet record");
                    self.prune_backups(&record.identity, self.keep_backups)?;
                }
            }
            _ => {}
        }

        let envelope = RecordEnvelope {
            magic: *RECORD_MAGIC,
            version: RECORD_FORMAT_VERSION,
            checksum: record_checksum(record)?,
            payload: record.clone(),
        };
        let serialized = zeroize::Zeroizing::new(serde_json::to_vec_pretty(&envelope)?);
        let staged = self.write_staged(&path, &serialized)?;

        let published = match mode {
            WriteMode::Create => staged.persist_noclobber(&path),
            WriteMode::Update | WriteMode::Replace => staged.persist(&path),
        };
        match published {
            Ok(_) => Ok(()),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(already_exists(&path))
            }
            Err(err) => Err(err.error.into()),
        }
    }

    fn remove(&self, identity: &str) -> WalletResult<bool> {
        match fs::remove_file(self.record_path(identity)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process backend for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<String, WalletRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecordBackend for MemoryBackend {
    fn load(&self, identity: &str) -> WalletResult<Option<WalletRecord>> {
        Ok(self.records.read().get(identity).cloned())
    }

    fn save(&self, record: &WalletRecord, mode: WriteMode) -> WalletResult<()> {
        let mut records = self.records.write();
        if mode == WriteMode::Create && records.contains_key(&record.identity) {
            return Err(WalletError::StoreError(format!(
                "Record already exists for '{}'",
                record.identity
            )));
        }
        records.insert(record.identity.clone(), record.clone());
        Ok(())
    }

    fn remove(&self, identity: &str) -> WalletResult<bool> {
        Ok(self.records.write().remove(identity).is_some())
    }
}

fn record_checksum(record: &WalletRecord) -> WalletResult<[u8; 32]> {
    let encoded = zeroize::Zeroizing::new(serde_json::to_vec(record)?);
    let mut hasher = Blake3::new();
    hasher.update(&encoded);
    Ok(*hasher.finalize().as_bytes())
}

fn already_exists(path: &Path) -> WalletError {
    WalletError::StoreError(format!("Record already exists: {}", path.display()))
}
