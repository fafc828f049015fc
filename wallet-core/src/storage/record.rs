use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{MasterKey, Mnemonic, Seed};
use crate::encoding::{encode_address, Address, AddressKey, AddressRegistry, ChainId, ExportedSecret};
use crate::errors::{WalletError, WalletResult};
use crate::pipeline::WalletMaterial;

/// Persisted wallet of one identity.
///
/// `mnemonic`, `seed`, `master_key` and existing entries of
/// `exported_secret_by_chain` are fixed at creation; migrations only append.
/// `Debug` is safe to log because every secret field redacts itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub identity: String,
    pub mnemonic: Mnemonic,
    pub seed: Seed,
    pub master_key: MasterKey,
    pub exported_secret_by_chain: BTreeMap<ChainId, ExportedSecret>,
    pub addresses: BTreeMap<AddressKey, Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u32,
}

impl WalletRecord {
    /// Build a complete record for every entry of `registry`.
    pub fn from_material(
        identity: impl Into<String>,
        material: WalletMaterial,
        registry: &AddressRegistry,
        compressed_exports: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            identity: identity.into(),
            addresses: material.addresses(registry),
            exported_secret_by_chain: material.exports(registry, compressed_exports),
            mnemonic: material.mnemonic,
            seed: material.seed,
            master_key: material.master_key,
            created_at: now,
            updated_at: now,
            schema_version: registry.schema_version(),
        }
    }

    /// Registry entries this record has no address for yet.
    pub fn missing_keys(&self, registry: &AddressRegistry) -> Vec<AddressKey> {
        registry
            .keys()
            .filter(|key| !self.addresses.contains_key(key))
            .collect()
    }

    /// Whether [`WalletRecord::extend`] would change anything.
    pub fn needs_migration(&self, registry: &AddressRegistry) -> bool {
        self.schema_version < registry.schema_version()
            || !self.missing_keys(registry).is_empty()
            || registry
                .chains()
                .any(|chain| !self.exported_secret_by_chain.contains_key(&chain.chain))
    }

    /// Append addresses and exports for registry entries the record lacks, using
    /// the stored master key. Returns the number of addresses added.
    pub fn extend(&mut self, registry: &AddressRegistry, compressed_exports: bool) -> usize {
        let mut added = 0;
        for (chain, variant) in registry.entries() {
            let key = AddressKey::new(chain.chain.clone(), variant.variant.clone());
            if !self.addresses.contains_key(&key) {
                self.addresses
                    .insert(key, encode_address(&self.master_key, variant));
                added += 1;
            }
        }

        for chain in registry.chains() {
            if !self.exported_secret_by_chain.contains_key(&chain.chain) {
                self.exported_secret_by_chain.insert(
                    chain.chain.clone(),
                    ExportedSecret::encode(&self.master_key, chain, compressed_exports),
                );
            }
        }

        self.schema_version = self.schema_version.max(registry.schema_version());
        self.updated_at = Utc::now();
        added
    }

    /// Check internal consistency: the master key follows from the seed and every
    /// registered address follows from the master key.
    pub fn audit(&self, registry: &AddressRegistry) -> WalletResult<()> {
        if MasterKey::derive(&self.seed)? != self.master_key {
            return Err(WalletError::CryptoError(format!(
                "Master key of '{}' does not match its seed",
                self.identity
            )));
        }

        for (key, address) in &self.addresses {
            match registry.verify(&self.master_key, key, address) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(WalletError::CryptoError(format!(
                        "Stored address {key} of '{}' does not match its master key",
                        self.identity
                    )))
                }
                // Entries from a newer registry cannot be checked here.
                Err(WalletError::UnknownVariant { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
