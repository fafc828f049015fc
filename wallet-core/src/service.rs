use std::path::Path;

use crate::api::types::{WalletExport, WalletView};
use crate::config_store::{ConfigStore, WalletConfig};
use crate::encoding::AddressRegistry;
use crate::errors::{WalletError, WalletResult};
use crate::storage::{FileBackend, RecordBackend, StorePaths, WalletStore};

pub const ENVIRONMENT_VAR: &str = "IDENTITY_WALLET_ENV";

/// Boundary between callers and the record store.
///
/// Read paths return [`WalletView`]; only [`WalletService::export_wallet`]
/// surfaces secret material.
pub struct WalletService<B: RecordBackend = FileBackend> {
    store: WalletStore<B>,
    environment: String,
}

impl WalletService<FileBackend> {
    /// Open (creating if needed) a file-backed wallet directory.
    pub fn open(root_dir: impl AsRef<Path>) -> WalletResult<Self> {
        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());
        let paths = StorePaths::new(root_dir)?;
        paths.ensure_directories()?;

        let config = ConfigStore::from_paths(&paths).load_or_default(environment.clone())?;
        Ok(Self::from_config(paths, &config, environment))
    }

    fn from_config(paths: StorePaths, config: &WalletConfig, environment: String) -> Self {
        tracing::debug!(
            root = %paths.root_dir().display(),
            environment = %environment,
            backups = config.storage.backup_on_regenerate,
            "opening wallet service"
        );
        let backend = FileBackend::new(paths).with_backups(
            config.storage.backup_on_regenerate,
            config.storage.keep_backups,
        );
        let store = WalletStore::new(backend, AddressRegistry::standard())
            .with_derivation(config.derivation.clone());
        Self { store, environment }
    }

    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::from_paths(self.store.backend().paths())
    }

    pub fn load_config(&self) -> WalletResult<WalletConfig> {
        self.config_store().load_or_default(self.environment.clone())
    }
}

impl<B: RecordBackend> WalletService<B> {
    pub fn new(store: WalletStore<B>, environment: impl Into<String>) -> Self {
        Self {
            store,
            environment: environment.into(),
        }
    }

    pub fn store(&self) -> &WalletStore<B> {
        &self.store
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn get_or_create_wallet(&self, identity: &str) -> WalletResult<WalletView> {
        let outcome = self.store.get_or_create(identity)?;
        Ok(WalletView::from(&outcome))
    }

    pub fn regenerate_wallet(&self, identity: &str) -> WalletResult<WalletView> {
        let record = self.store.regenerate(identity)?;
        Ok(WalletView::from(&record))
    }

    /// Secret export of an existing wallet; `NotFound` if there is none.
    pub fn export_wallet(&self, identity: &str) -> WalletResult<WalletExport> {
        let record = self
            .store
            .load(identity)?
            .ok_or_else(|| WalletError::NotFound(format!("No wallet for '{identity}'")))?;
        tracing::info!(identity, "exported wallet secrets");
        Ok(WalletExport::from(&record))
    }

    pub fn import_wallet(
        &self,
        identity: &str,
        phrase: &str,
        passphrase: &str,
    ) -> WalletResult<WalletView> {
        let record = self.store.import(identity, phrase, passphrase)?;
        Ok(WalletView::from(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use tempfile::TempDir;

    fn memory_service() -> WalletService<MemoryBackend> {
        let store = WalletStore::new(MemoryBackend::new(), AddressRegistry::standard());
        WalletService::new(store, "test")
    }

    #[test]
    fn view_is_stable_across_calls() {
        let service = memory_service();
        let first = service.get_or_create_wallet("alice").unwrap();
        let second = service.get_or_create_wallet("alice").unwrap();

        assert_eq!(first, second);
        assert!(!first.migration_pending);
        assert_eq!(first.addresses.len(), service.store().registry().len());
    }

    #[test]
    fn export_requires_existing_wallet() {
        let service = memory_service();
        assert!(matches!(
            service.export_wallet("nobody"),
            Err(WalletError::NotFound(_))
        ));

        let view = service.get_or_create_wallet("alice").unwrap();
        let export = service.export_wallet("alice").unwrap();
        assert_eq!(export.addresses, view.addresses);
        assert_eq!(export.mnemonic.split_whitespace().count(), 12);
    }

    #[test]
    fn open_uses_persisted_config() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::new(dir.path()).unwrap();
        ConfigStore::from_paths(&paths)
            .update("test", |config| {
                config.derivation.entropy_strength = crate::crypto::EntropyStrength::Bits256;
                Ok(())
            })
            .unwrap();

        let service = WalletService::open(dir.path()).unwrap();
        service.get_or_create_wallet("alice").unwrap();
        let export = service.export_wallet("alice").unwrap();
        assert_eq!(export.mnemonic.split_whitespace().count(), 24);
        assert!(dir.path().join("records").exists());
    }
}
