use sha2::{Digest, Sha256};

use crate::errors::{WalletError, WalletResult};

pub const CHECKSUM_LEN: usize = 4;

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// First four bytes of SHA-256(SHA-256(data)).
pub fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = double_sha256(data);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Encode `version || body || checksum` with the Bitcoin base58 alphabet.
/// Leading zero bytes are preserved as leading `1` characters.
pub fn encode(version: u8, body: &[u8]) -> String {
    let mut data = Vec::with_capacity(1 + body.len() + CHECKSUM_LEN);
    data.push(version);
    data.extend_from_slice(body);
    let sum = checksum(&data);
    data.extend_from_slice(&sum);
    bs58::encode(data).into_string()
}

/// Decode and verify, returning the version byte and body.
pub fn decode(encoded: &str) -> WalletResult<(u8, Vec<u8>)> {
    let data = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| WalletError::InvalidAddress(format!("Invalid base58: {e}")))?;

    if data.len() < 1 + CHECKSUM_LEN {
        return Err(WalletError::InvalidAddress(format!(
            "Encoded value too short: {} bytes",
            data.len()
        )));
    }

    let (versioned, sum) = data.split_at(data.len() - CHECKSUM_LEN);
    if checksum(versioned) != sum {
        return Err(WalletError::InvalidChecksum);
    }

    Ok((versioned[0], versioned[1..].to_vec()))
}
