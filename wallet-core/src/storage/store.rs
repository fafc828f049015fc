use std::sync::Arc;

use crate::config_store::DerivationConfig;
use crate::crypto::Mnemonic;
use crate::encoding::AddressRegistry;
use crate::errors::{WalletError, WalletResult};
use crate::pipeline::WalletMaterial;

use super::backend::{RecordBackend, WriteMode};
use super::locks::IdentityLocks;
use super::record::WalletRecord;

const MAX_IDENTITY_LEN: usize = 256;

/// What `get_or_create` did to reach the returned record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Created,
    UpToDate,
    Migrated { added: usize },
    /// The record is older than the registry and could not be upgraded. The
    /// returned record is the stored, un-migrated one.
    Failed(WalletError),
}

#[derive(Debug, Clone)]
pub struct StoreOutcome {
    pub record: WalletRecord,
    pub migration: MigrationOutcome,
}

impl StoreOutcome {
    pub fn migration_pending(&self) -> bool {
        matches!(self.migration, MigrationOutcome::Failed(_))
    }
}

/// Idempotent per-identity wallet persistence over a [`RecordBackend`].
pub struct WalletStore<B: RecordBackend> {
    backend: B,
    registry: Arc<AddressRegistry>,
    derivation: DerivationConfig,
    locks: IdentityLocks,
}

impl<B: RecordBackend> WalletStore<B> {
    pub fn new(backend: B, registry: impl Into<Arc<AddressRegistry>>) -> Self {
        Self {
            backend,
            registry: registry.into(),
            derivation: DerivationConfig::default(),
            locks: IdentityLocks::new(),
        }
    }

    pub fn with_derivation(mut self, derivation: DerivationConfig) -> Self {
        self.derivation = derivation;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &AddressRegistry {
        &self.registry
    }

    pub fn derivation(&self) -> &DerivationConfig {
        &self.derivation
    }

    /// Return the identity's wallet, creating it on first use and upgrading it
    /// when the registry has grown since it was written.
    pub fn get_or_create(&self, identity: &str) -> WalletResult<StoreOutcome> {
        validate_identity(identity)?;
        self.locks.with_identity(identity, || {
            if let Some(record) = self.load_audited(identity)? {
                return Ok(self.migrate_locked(record));
            }

            let record = self.fresh_record(identity)?;
            if let Err(err) = self.backend.save(&record, WriteMode::Create) {
                // Another store sharing the backend may have created it first.
                return match self.load_audited(identity)? {
                    Some(existing) => {
                        tracing::info!(
                            identity,
                            "wallet created concurrently; using stored record"
                        );
                        Ok(self.migrate_locked(existing))
                    }
                    None => Err(err),
                };
            }
            tracing::info!(
                identity,
                schema_version = record.schema_version,
                addresses = record.addresses.len(),
                "created wallet"
            );
            Ok(StoreOutcome {
                record,
                migration: MigrationOutcome::Created,
            })
        })
    }

    /// Replace the identity's wallet with one derived from fresh entropy.
    pub fn regenerate(&self, identity: &str) -> WalletResult<WalletRecord> {
        validate_identity(identity)?;
        let record = self.fresh_record(identity)?;
        self.locks.with_identity(identity, || {
            self.backend.save(&record, WriteMode::Replace)?;
            tracing::info!(
                identity,
                schema_version = record.schema_version,
                "regenerated wallet"
            );
            Ok(record)
        })
    }

    /// Replace the identity's wallet with one restored from a recovery phrase.
    pub fn import(
        &self,
        identity: &str,
        phrase: &str,
        passphrase: &str,
    ) -> WalletResult<WalletRecord> {
        validate_identity(identity)?;
        let mnemonic = Mnemonic::parse(phrase)?;
        let material = WalletMaterial::from_mnemonic(mnemonic, passphrase)?;
        let record = WalletRecord::from_material(
            identity,
            material,
            &self.registry,
            self.derivation.compressed_exports,
        );

        self.locks.with_identity(identity, || {
            self.backend.save(&record, WriteMode::Replace)?;
            tracing::info!(identity, "imported wallet from recovery phrase");
            Ok(record)
        })
    }

    /// Bring a stored record up to the current registry.
    ///
    /// Works on the persisted copy of `record`, so a stale caller copy cannot
    /// overwrite fields written since it was read. Fails with `StoreError` if
    /// the identity's wallet was replaced in the meantime.
    pub fn migrate(&self, record: &WalletRecord) -> WalletResult<WalletRecord> {
        validate_identity(&record.identity)?;
        let identity = record.identity.as_str();
        self.locks.with_identity(identity, || {
            let mut current = self
                .load_audited(identity)?
                .ok_or_else(|| WalletError::NotFound(format!("No wallet for '{identity}'")))?;
            if current.master_key != record.master_key {
                return Err(WalletError::StoreError(format!(
                    "Wallet of '{identity}' was replaced concurrently"
                )));
            }
            if !current.needs_migration(&self.registry) {
                return Ok(current);
            }

            let from_version = current.schema_version;
            let added = current.extend(&self.registry, self.derivation.compressed_exports);
            self.backend.save(&current, WriteMode::Update)?;
            tracing::info!(
                identity,
                from_version,
                schema_version = current.schema_version,
                added,
                "migrated wallet"
            );
            Ok(current)
        })
    }

    pub fn load(&self, identity: &str) -> WalletResult<Option<WalletRecord>> {
        validate_identity(identity)?;
        self.locks
            .with_identity(identity, || self.load_audited(identity))
    }

    pub fn delete(&self, identity: &str) -> WalletResult<bool> {
        validate_identity(identity)?;
        self.locks.with_identity(identity, || {
            let removed = self.backend.remove(identity)?;
            if removed {
                tracing::info!(identity, "deleted wallet");
            }
            Ok(removed)
        })
    }

    fn fresh_record(&self, identity: &str) -> WalletResult<WalletRecord> {
        let material = WalletMaterial::generate(self.derivation.entropy_strength, "")?;
        Ok(WalletRecord::from_material(
            identity,
            material,
            &self.registry,
            self.derivation.compressed_exports,
        ))
    }

    fn load_audited(&self, identity: &str) -> WalletResult<Option<WalletRecord>> {
        match self.backend.load(identity)? {
            Some(record) => {
                record.audit(&self.registry)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    // Caller holds the identity lock.
    fn migrate_locked(&self, record: WalletRecord) -> StoreOutcome {
        if !record.needs_migration(&self.registry) {
            return StoreOutcome {
                record,
                migration: MigrationOutcome::UpToDate,
            };
        }

        let mut migrated = record.clone();
        let added = migrated.extend(&self.registry, self.derivation.compressed_exports);
        match self.backend.save(&migrated, WriteMode::Update) {
            Ok(()) => {
                tracing::info!(
                    identity = %migrated.identity,
                    from_version = record.schema_version,
                    schema_version = migrated.schema_version,
                    added,
                    "migrated wallet"
                );
                StoreOutcome {
                    record: migrated,
                    migration: MigrationOutcome::Migrated { added },
                }
            }
            Err(err) => {
                tracing::warn!(
                    identity = %record.identity,
                    schema_version = record.schema_version,
                    error = %err,
                    "wallet migration failed; serving stored record"
                );
                StoreOutcome {
                    record,
                    migration: MigrationOutcome::Failed(err),
                }
            }
        }
    }
}

fn validate_identity(identity: &str) -> WalletResult<()> {
    if identity.is_empty() {
        return Err(WalletError::ValidationError(
            "Identity cannot be empty".to_string(),
        ));
    }
    if identity.len() > MAX_IDENTITY_LEN {
        return Err(WalletError::ValidationError(format!(
            "Identity longer than {MAX_IDENTITY_LEN} bytes"
        )));
    }
    if identity.chars().any(char::is_control) {
        return Err(WalletError::ValidationError(
            "Identity contains control characters".to_string(),
        ));
    }
    Ok(())
}
