//! Pure key-derivation stages of the wallet pipeline.
//!
//! Every function here is deterministic in its inputs except
//! [`Entropy::generate`], and none of them touch shared state, so they can be
//! called from any thread without coordination.

pub mod entropy;
pub mod master_key;
pub mod mnemonic;
pub mod seed;

pub use entropy::{Entropy, EntropyStrength};
pub use master_key::{MasterKey, MASTER_KEY_LEN};
pub use mnemonic::Mnemonic;
pub use seed::{Seed, SEED_LEN};
