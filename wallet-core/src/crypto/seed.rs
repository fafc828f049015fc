use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::mnemonic::Mnemonic;
use crate::errors::{WalletError, WalletResult};

pub const SEED_LEN: usize = 64;

/// 64-byte seed stretched from a mnemonic and optional passphrase.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    /// PBKDF2-HMAC-SHA512 with 2048 rounds over the phrase, salted with
    /// `"mnemonic" + passphrase`.
    pub fn derive(mnemonic: &Mnemonic, passphrase: &str) -> WalletResult<Self> {
        let parsed = bip39::Mnemonic::parse_in_normalized(bip39::Language::English, mnemonic.phrase())?;
        Ok(Self(parsed.to_seed(passphrase)))
    }

    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(encoded: &str) -> WalletResult<Self> {
        let decoded = hex::decode(encoded)
            .map_err(|e| WalletError::ValidationError(format!("Invalid seed hex: {e}")))?;
        let bytes: [u8; SEED_LEN] = decoded.as_slice().try_into().map_err(|_| {
            WalletError::ValidationError(format!(
                "Invalid seed length: expected {SEED_LEN}, got {}",
                decoded.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Seed::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn matches_reference_vector_with_passphrase() {
        let mnemonic = Mnemonic::parse(ZERO_PHRASE).unwrap();
        let seed = Seed::derive(&mnemonic, "TREZOR").unwrap();
        assert_eq!(
            seed.to_hex(),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let mnemonic = Mnemonic::parse(ZERO_PHRASE).unwrap();
        let first = Seed::derive(&mnemonic, "").unwrap();
        let second = Seed::derive(&mnemonic, "").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn passphrase_changes_seed() {
        let mnemonic = Mnemonic::parse(ZERO_PHRASE).unwrap();
        let plain = Seed::derive(&mnemonic, "").unwrap();
        let salted = Seed::derive(&mnemonic, "extra words").unwrap();
        assert_ne!(plain, salted);
    }

    #[test]
    fn hex_round_trip_and_length_check() {
        let seed = Seed::from_bytes([7u8; SEED_LEN]);
        assert_eq!(Seed::from_hex(&seed.to_hex()).unwrap(), seed);
        assert!(matches!(
            Seed::from_hex("abcd"),
            Err(WalletError::ValidationError(_))
        ));
    }
}
