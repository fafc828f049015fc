use bip39::Language;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::entropy::Entropy;
use crate::errors::{WalletError, WalletResult};

/// Recovery phrase over the English BIP39 word list.
///
/// The phrase is the single source every other secret of a wallet is regenerated from.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic {
    phrase: String,
}

impl Mnemonic {
    /// Encode entropy plus its SHA-256 checksum bits as 11-bit word indices.
    pub fn encode(entropy: &Entropy) -> WalletResult<Self> {
        let mnemonic = bip39::Mnemonic::from_entropy_in(Language::English, entropy.as_bytes())
            .map_err(|e| WalletError::CryptoError(format!("Mnemonic encoding failed: {e}")))?;
        Ok(Self {
            phrase: mnemonic.to_string(),
        })
    }

    /// Parse a user-supplied phrase, verifying word membership and checksum.
    ///
    /// Whitespace is collapsed and case folded before parsing.
    pub fn parse(phrase: &str) -> WalletResult<Self> {
        let normalized = normalize_phrase(phrase);
        let mnemonic = bip39::Mnemonic::parse_in_normalized(Language::English, &normalized)?;
        Ok(Self {
            phrase: mnemonic.to_string(),
        })
    }

    /// Recover the entropy, failing with `InvalidChecksum` when the trailing
    /// checksum bits do not match.
    pub fn decode(&self) -> WalletResult<Entropy> {
        let mnemonic = bip39::Mnemonic::parse_in_normalized(Language::English, &self.phrase)?;
        Entropy::from_bytes(mnemonic.to_entropy())
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.phrase.split_whitespace()
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }
}

impl std::fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mnemonic")
            .field("word_count", &self.word_count())
            .field("phrase", &"<redacted>")
            .finish()
    }
}

impl Serialize for Mnemonic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.phrase)
    }
}

// Persisted phrases are re-validated on load so a corrupted record never
// yields a wallet that cannot be recovered from its own mnemonic.
impl<'de> Deserialize<'de> for Mnemonic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let phrase = zeroize::Zeroizing::new(String::deserialize(deserializer)?);
        Mnemonic::parse(&phrase).map_err(serde::de::Error::custom)
    }
}

fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::entropy::EntropyStrength;
    use crate::errors::WalletError;

    const ZERO_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn known_vector_encodes_and_decodes() {
        let entropy = Entropy::from_bytes(vec![0u8; 16]).unwrap();
        let mnemonic = Mnemonic::encode(&entropy).unwrap();
        assert_eq!(mnemonic.phrase(), ZERO_PHRASE);
        assert_eq!(mnemonic.decode().unwrap(), entropy);
    }

    #[test]
    fn decode_inverts_encode_for_random_entropy() {
        for strength in [EntropyStrength::Bits128, EntropyStrength::Bits256] {
            for _ in 0..16 {
                let entropy = Entropy::generate(strength).unwrap();
                let mnemonic = Mnemonic::encode(&entropy).unwrap();
                assert_eq!(mnemonic.word_count(), strength.word_count());
                assert_eq!(mnemonic.decode().unwrap(), entropy);
            }
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let entropy = Entropy::from_bytes((0u8..32).collect()).unwrap();
        assert_eq!(
            Mnemonic::encode(&entropy).unwrap(),
            Mnemonic::encode(&entropy).unwrap()
        );
    }

    #[test]
    fn swapped_last_word_fails_checksum() {
        let corrupted = ZERO_PHRASE.replace("about", "abandon");
        let err = Mnemonic::parse(&corrupted).unwrap_err();
        assert_eq!(err, WalletError::InvalidChecksum);
    }

    #[test]
    fn single_word_substitution_is_detected() {
        let entropy = Entropy::from_bytes(vec![0x5Au8; 16]).unwrap();
        let mnemonic = Mnemonic::encode(&entropy).unwrap();
        let words: Vec<&str> = mnemonic.words().collect();
        let english = Language::English.word_list();

        // Try several substitutions per position; with a 4-bit checksum roughly
        // one in sixteen substitutions collides, so require the large majority fail.
        let mut detected = 0;
        let mut attempts = 0;
        for position in 0..words.len() {
            for replacement in english.iter().take(24) {
                if *replacement == words[position] {
                    continue;
                }
                let mut altered = words.clone();
                altered[position] = *replacement;
                attempts += 1;
                if matches!(
                    Mnemonic::parse(&altered.join(" ")),
                    Err(WalletError::InvalidChecksum)
                ) {
                    detected += 1;
                }
            }
        }
        assert!(detected * 10 >= attempts * 8, "{detected}/{attempts} detected");
    }

    #[test]
    fn unknown_word_is_invalid_mnemonic() {
        let corrupted = ZERO_PHRASE.replace("about", "notaword");
        assert!(matches!(
            Mnemonic::parse(&corrupted),
            Err(WalletError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn parse_normalizes_case_and_spacing() {
        let messy = format!("  {}  ", ZERO_PHRASE.to_uppercase().replace(' ', "   "));
        let mnemonic = Mnemonic::parse(&messy).unwrap();
        assert_eq!(mnemonic.phrase(), ZERO_PHRASE);
    }

    #[test]
    fn deserializing_a_corrupted_phrase_fails() {
        let json = serde_json::to_string(&ZERO_PHRASE.replace("about", "abandon")).unwrap();
        assert!(serde_json::from_str::<Mnemonic>(&json).is_err());

        let valid = serde_json::to_string(ZERO_PHRASE).unwrap();
        let mnemonic: Mnemonic = serde_json::from_str(&valid).unwrap();
        assert_eq!(mnemonic.phrase(), ZERO_PHRASE);
    }

    #[test]
    fn debug_does_not_print_phrase() {
        let mnemonic = Mnemonic::parse(ZERO_PHRASE).unwrap();
        assert!(!format!("{mnemonic:?}").contains("abandon"));
    }
}
