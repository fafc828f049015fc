//! Deterministic wallet derivation, multi-chain address encoding and
//! per-identity wallet persistence.

pub mod api;
pub mod config_store;
pub mod crypto;
pub mod encoding;
pub mod errors;
pub mod pipeline;
pub mod service;
pub mod storage;

pub use api::types::{WalletExport, WalletView};
pub use config_store::{ConfigStore, DerivationConfig, StorageConfig, WalletConfig};
pub use crypto::{Entropy, EntropyStrength, MasterKey, Mnemonic, Seed};
pub use encoding::{
    encode_address, Address, AddressKey, AddressRegistry, AddressVariant, ChainId, ChainSpec,
    ExportedSecret, VariantSpec,
};
pub use errors::{WalletError, WalletResult};
pub use pipeline::WalletMaterial;
pub use service::WalletService;
pub use storage::{
    FileBackend, MemoryBackend, MigrationOutcome, RecordBackend, StoreOutcome, StorePaths,
    WalletRecord, WalletStore,
};
