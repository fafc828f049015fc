use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::storage::{StoreOutcome, WalletRecord};

/// Public view of a wallet. Never carries secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub identity: String,
    /// Keyed by `chain:variant`.
    pub addresses: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u32,
    /// Set when the stored record is behind the address registry and the
    /// upgrade could not be persisted.
    #[serde(default)]
    pub migration_pending: bool,
}

impl WalletView {
    pub fn from_record(record: &WalletRecord, migration_pending: bool) -> Self {
        Self {
            identity: record.identity.clone(),
            addresses: address_map(record),
            created_at: record.created_at,
            schema_version: record.schema_version,
            migration_pending,
        }
    }
}

impl From<&WalletRecord> for WalletView {
    fn from(record: &WalletRecord) -> Self {
        Self::from_record(record, false)
    }
}

impl From<&StoreOutcome> for WalletView {
    fn from(outcome: &StoreOutcome) -> Self {
        Self::from_record(&outcome.record, outcome.migration_pending())
    }
}

/// Secret-bearing export of a wallet for backup or transfer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletExport {
    pub identity: String,
    pub mnemonic: String,
    pub exported_secret_by_chain: BTreeMap<String, String>,
    pub addresses: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl From<&WalletRecord> for WalletExport {
    fn from(record: &WalletRecord) -> Self {
        Self {
            identity: record.identity.clone(),
            mnemonic: record.mnemonic.phrase().to_string(),
            exported_secret_by_chain: record
                .exported_secret_by_chain
                .iter()
                .map(|(chain, secret)| (chain.to_string(), secret.expose().to_string()))
                .collect(),
            addresses: address_map(record),
            created_at: record.created_at,
        }
    }
}

impl fmt::Debug for WalletExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletExport")
            .field("identity", &self.identity)
            .field("mnemonic", &"[REDACTED]")
            .field(
                "exported_secret_by_chain",
                &self.exported_secret_by_chain.keys().collect::<Vec<_>>(),
            )
            .field("addresses", &self.addresses)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Drop for WalletExport {
    fn drop(&mut self) {
        self.mnemonic.zeroize();
        for secret in self.exported_secret_by_chain.values_mut() {
            secret.zeroize();
        }
    }
}

fn address_map(record: &WalletRecord) -> BTreeMap<String, String> {
    record
        .addresses
        .iter()
        .map(|(key, address)| (key.to_string(), address.as_str().to_string()))
        .collect()
}
