//! Address and secret-export encodings derived from a wallet master key.

pub mod address;
pub mod base58check;
pub mod export;
pub mod registry;

pub use address::{encode_address, Address, AddressKey, AddressVariant, ChainId, DecodedAddress};
pub use export::{DecodedSecret, ExportedSecret};
pub use registry::{AddressRegistry, ChainSpec, VariantSpec};
