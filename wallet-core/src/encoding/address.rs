use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::base58check;
use super::registry::VariantSpec;
use crate::crypto::MasterKey;
use crate::errors::{WalletError, WalletResult};

pub const ADDRESS_PAYLOAD_LEN: usize = 20;

/// Separator between chain and variant in the persisted address key.
const KEY_SEPARATOR: char = ':';

/// Identifier of a chain in the address registry, e.g. `bitcoin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Encoding scheme of an address within one chain, e.g. `legacy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressVariant(String);

impl AddressVariant {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddressVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AddressVariant {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// (chain, variant) selector. Persisted as `"chain:variant"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressKey {
    pub chain: ChainId,
    pub variant: AddressVariant,
}

impl AddressKey {
    pub fn new(chain: impl Into<ChainId>, variant: impl Into<AddressVariant>) -> Self {
        Self {
            chain: chain.into(),
            variant: variant.into(),
        }
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.chain, KEY_SEPARATOR, self.variant)
    }
}

impl FromStr for AddressKey {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(KEY_SEPARATOR) {
            Some((chain, variant)) if !chain.is_empty() && !variant.is_empty() => {
                Ok(Self::new(chain, variant))
            }
            _ => Err(WalletError::ValidationError(format!(
                "Invalid address key '{s}', expected chain{KEY_SEPARATOR}variant"
            ))),
        }
    }
}

impl Serialize for AddressKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AddressKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Shareable, checksummed address string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

/// Components of an address after checksum verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    pub version: u8,
    pub payload: [u8; ADDRESS_PAYLOAD_LEN],
}

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Parse an address string, verifying its checksum and payload length.
    pub fn parse(encoded: &str) -> WalletResult<Self> {
        Self::decode(encoded)?;
        Ok(Self(encoded.to_string()))
    }

    pub fn decode(encoded: &str) -> WalletResult<DecodedAddress> {
        let (version, body) = base58check::decode(encoded)?;
        let payload: [u8; ADDRESS_PAYLOAD_LEN] = body.as_slice().try_into().map_err(|_| {
            WalletError::InvalidAddress(format!(
                "Invalid payload length: expected {ADDRESS_PAYLOAD_LEN}, got {}",
                body.len()
            ))
        })?;
        Ok(DecodedAddress { version, payload })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the address of `spec` for `master_key`.
///
/// The payload is the first 20 bytes of SHA-256(domain_tag || master_key), so two
/// variants that share a version byte still produce different addresses.
pub fn encode_address(master_key: &MasterKey, spec: &VariantSpec) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(spec.domain_tag.as_bytes());
    hasher.update(master_key.as_bytes());
    let digest = hasher.finalize();

    Address(base58check::encode(
        spec.version,
        &digest[..ADDRESS_PAYLOAD_LEN],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(tag: &str, version: u8) -> VariantSpec {
        VariantSpec::new("legacy", version, tag, 1)
    }

    fn key() -> MasterKey {
        MasterKey::from_bytes([0x11; 32]).unwrap()
    }

    #[test]
    fn address_key_round_trips_through_string() {
        let key = AddressKey::new("bitcoin", "legacy");
        assert_eq!(key.to_string(), "bitcoin:legacy");
        assert_eq!("bitcoin:legacy".parse::<AddressKey>().unwrap(), key);
        assert!("bitcoin".parse::<AddressKey>().is_err());
        assert!(":legacy".parse::<AddressKey>().is_err());
    }

    #[test]
    fn encoding_is_deterministic_and_verifies() {
        let first = encode_address(&key(), &spec("tag-a", 0x00));
        let second = encode_address(&key(), &spec("tag-a", 0x00));
        assert_eq!(first, second);

        let decoded = Address::decode(first.as_str()).unwrap();
        assert_eq!(decoded.version, 0x00);
        assert!(first.as_str().starts_with('1'));
    }

    #[test]
    fn shared_version_byte_does_not_collide() {
        let a = encode_address(&key(), &spec("tag-a", 0x00));
        let b = encode_address(&key(), &spec("tag-b", 0x00));
        assert_ne!(a, b);
        assert_eq!(
            Address::decode(a.as_str()).unwrap().version,
            Address::decode(b.as_str()).unwrap().version
        );
    }

    #[test]
    fn decode_rejects_wrong_payload_length() {
        let encoded = base58check::encode(0x00, &[1u8; 32]);
        assert!(matches!(
            Address::decode(&encoded),
            Err(WalletError::InvalidAddress(_))
        ));
    }
}
