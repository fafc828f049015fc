use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::base58check;
use super::registry::ChainSpec;
use crate::crypto::{MasterKey, MASTER_KEY_LEN};
use crate::errors::{WalletError, WalletResult};

/// Trailing byte marking that the key is used with compressed public keys.
const COMPRESSED_FLAG: u8 = 0x01;

/// WIF-style export of the master key. Confers spending authority, so it is a
/// separate type from [`super::Address`] and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct ExportedSecret(String);

/// Components of an exported secret after checksum verification.
#[derive(Debug)]
pub struct DecodedSecret {
    pub version: u8,
    pub key: MasterKey,
    pub compressed: bool,
}

impl ExportedSecret {
    /// `secret_version || master_key || [0x01]` with a base58check checksum.
    pub fn encode(master_key: &MasterKey, chain: &ChainSpec, compressed: bool) -> Self {
        let mut body = Zeroizing::new(Vec::with_capacity(MASTER_KEY_LEN + 1));
        body.extend_from_slice(master_key.as_bytes());
        if compressed {
            body.push(COMPRESSED_FLAG);
        }
        Self(base58check::encode(chain.secret_version, &body))
    }

    pub fn decode(encoded: &str) -> WalletResult<DecodedSecret> {
        let (version, body) = base58check::decode(encoded)?;
        let body = Zeroizing::new(body);

        let compressed = match body.len() {
            len if len == MASTER_KEY_LEN => false,
            len if len == MASTER_KEY_LEN + 1 && body[MASTER_KEY_LEN] == COMPRESSED_FLAG => true,
            len => {
                return Err(WalletError::ValidationError(format!(
                    "Invalid exported secret length: {len}"
                )))
            }
        };

        let mut key_bytes = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        key_bytes.copy_from_slice(&body[..MASTER_KEY_LEN]);
        Ok(DecodedSecret {
            version,
            key: MasterKey::from_bytes(*key_bytes)?,
            compressed,
        })
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ExportedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExportedSecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{Address, AddressRegistry};

    #[test]
    fn matches_bitcoin_wif_vector() {
        let key = MasterKey::from_hex(
            "0c28fca386c7a227600b2fe50b7cae11ec86d3bf1fbe471be89827e19d72aa1d",
        )
        .unwrap();
        let bitcoin = ChainSpec::new("bitcoin", 0x80);

        let uncompressed = ExportedSecret::encode(&key, &bitcoin, false);
        assert_eq!(
            uncompressed.expose(),
            "5HueCGU8rMjxEXxiPuD5BDku4MkFqeZyd4dZ1jvhTVqvbTLvyTJ"
        );

        let compressed = ExportedSecret::encode(&key, &bitcoin, true);
        let decoded = ExportedSecret::decode(compressed.expose()).unwrap();
        assert!(decoded.compressed);
        assert_eq!(decoded.version, 0x80);
        assert_eq!(decoded.key, key);
    }

    #[test]
    fn export_never_parses_as_address() {
        let registry = AddressRegistry::standard();
        let key = MasterKey::from_bytes([3u8; 32]).unwrap();
        for chain in registry.chains() {
            let secret = ExportedSecret::encode(&key, chain, true);
            assert!(Address::decode(secret.expose()).is_err());

            let version = ExportedSecret::decode(secret.expose()).unwrap().version;
            assert!(registry.entries().all(|(_, v)| v.version != version));
        }
    }

    #[test]
    fn debug_is_redacted() {
        let key = MasterKey::from_bytes([3u8; 32]).unwrap();
        let secret = ExportedSecret::encode(&key, &ChainSpec::new("bitcoin", 0x80), true);
        assert_eq!(format!("{secret:?}"), "ExportedSecret(<redacted>)");
    }

    #[test]
    fn rejects_bad_trailing_flag() {
        let mut body = vec![7u8; MASTER_KEY_LEN];
        body.push(0x02);
        let encoded = base58check::encode(0x80, &body);
        assert!(matches!(
            ExportedSecret::decode(&encoded),
            Err(WalletError::ValidationError(_))
        ));
    }
}
