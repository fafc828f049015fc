//! Persistence of wallet records, one per identity.

pub mod backend;
pub mod locks;
pub mod paths;
pub mod record;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, RecordBackend, WriteMode};
pub use locks::IdentityLocks;
pub use paths::StorePaths;
pub use record::WalletRecord;
pub use store::{MigrationOutcome, StoreOutcome, WalletStore};
