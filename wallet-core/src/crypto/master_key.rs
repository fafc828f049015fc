use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::seed::Seed;
use crate::errors::{WalletError, WalletResult};

pub const MASTER_KEY_LEN: usize = 32;

/// HMAC key separating the wallet root key from every other use of HMAC-SHA512.
const MASTER_KEY_DOMAIN: &[u8] = b"identity-wallet/master-key/v1";

/// Root private key of a wallet. All addresses and exports derive from it.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; MASTER_KEY_LEN]);

impl MasterKey {
    /// First 32 bytes of HMAC-SHA512(domain label, seed).
    pub fn derive(seed: &Seed) -> WalletResult<Self> {
        let mut hmac = Hmac::<Sha512>::new_from_slice(MASTER_KEY_DOMAIN)
            .map_err(|e| WalletError::CryptoError(format!("HMAC error: {}", e)))?;
        hmac.update(seed.as_bytes());
        let mut digest = hmac.finalize().into_bytes();

        let mut key = [0u8; MASTER_KEY_LEN];
        key.copy_from_slice(&digest[..MASTER_KEY_LEN]);
        digest.as_mut_slice().zeroize();
        Self::from_bytes(key)
    }

    pub fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> WalletResult<Self> {
        if bytes.iter().all(|&byte| byte == 0) {
            return Err(WalletError::CryptoError(
                "Master key cannot be zero".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    pub fn from_hex(encoded: &str) -> WalletResult<Self> {
        let decoded = Zeroizing::new(
            hex::decode(encoded)
                .map_err(|e| WalletError::ValidationError(format!("Invalid key hex: {e}")))?,
        );
        let bytes: [u8; MASTER_KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            WalletError::ValidationError(format!(
                "Invalid key length: expected {MASTER_KEY_LEN}, got {}",
                decoded.len()
            ))
        })?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

impl Serialize for MasterKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for MasterKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        MasterKey::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::seed::SEED_LEN;

    #[test]
    fn derivation_is_deterministic_with_fixed_length() {
        let seed = Seed::from_bytes([0x42; SEED_LEN]);
        let first = MasterKey::derive(&seed).unwrap();
        let second = MasterKey::derive(&seed).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_bytes().len(), MASTER_KEY_LEN);
    }

    #[test]
    fn distinct_seeds_yield_distinct_keys() {
        let a = MasterKey::derive(&Seed::from_bytes([1; SEED_LEN])).unwrap();
        let b = MasterKey::derive(&Seed::from_bytes([2; SEED_LEN])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn zero_key_is_rejected() {
        assert!(matches!(
            MasterKey::from_bytes([0; MASTER_KEY_LEN]),
            Err(WalletError::CryptoError(_))
        ));
    }

    #[test]
    fn serde_uses_hex() {
        let key = MasterKey::from_bytes([0xAB; MASTER_KEY_LEN]).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(MASTER_KEY_LEN)));
        let restored: MasterKey = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, key);
    }
}
