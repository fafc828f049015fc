use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{WalletError, WalletResult};

/// Entropy sizes accepted when generating a new wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntropyStrength {
    /// 128 bits, encodes to 12 words.
    #[default]
    Bits128,
    /// 256 bits, encodes to 24 words.
    Bits256,
}

impl EntropyStrength {
    pub const fn byte_len(self) -> usize {
        match self {
            EntropyStrength::Bits128 => 16,
            EntropyStrength::Bits256 => 32,
        }
    }

    pub const fn word_count(self) -> usize {
        match self {
            EntropyStrength::Bits128 => 12,
            EntropyStrength::Bits256 => 24,
        }
    }
}

/// Raw wallet entropy. Never persisted; only its mnemonic is.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Entropy(Vec<u8>);

impl Entropy {
    /// Draw fresh entropy from the operating system CSPRNG.
    ///
    /// A generator failure is fatal for wallet creation; there is no weaker fallback.
    pub fn generate(strength: EntropyStrength) -> WalletResult<Self> {
        let mut bytes = vec![0u8; strength.byte_len()];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| WalletError::EntropyUnavailable(e.to_string()))?;

        if bytes.iter().all(|&byte| byte == 0) {
            return Err(WalletError::EntropyUnavailable(
                "Generator returned an all-zero buffer".to_string(),
            ));
        }

        Ok(Self(bytes))
    }

    /// Wrap existing entropy bytes. Lengths follow the mnemonic encoding: 16 to 32
    /// bytes in steps of 4.
    pub fn from_bytes(bytes: Vec<u8>) -> WalletResult<Self> {
        if !(16..=32).contains(&bytes.len()) || bytes.len() % 4 != 0 {
            return Err(WalletError::ValidationError(format!(
                "Invalid entropy length: {} bytes",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Entropy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entropy")
            .field("len", &self.0.len())
            .field("bytes", &"<redacted>")
            .finish()
    }
}
