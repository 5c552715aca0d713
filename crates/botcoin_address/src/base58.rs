//! Base58Check: `version ‖ payload ‖ SHA-256d(version ‖ payload)[..4]`.

use botcoin_params::Network;
use botcoin_primitives::sha256d;

use crate::{AddressError, AddressKind, AddressPayload};

/// Version byte, 20-byte hash, 4-byte checksum.
pub const CHECKED_LEN: usize = 25;
const CHECKSUM_LEN: usize = 4;

pub fn encode_check(version: u8, payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    buf.push(version);
    buf.extend_from_slice(payload);
    let check = sha256d(&buf);
    buf.extend_from_slice(&check[..CHECKSUM_LEN]);
    bs58::encode(buf).into_string()
}

/// Strip and verify the checksum, returning `version ‖ payload`.
fn verify_check(raw: &[u8]) -> Result<&[u8], AddressError> {
    if raw.len() <= CHECKSUM_LEN {
        return Err(AddressError::InvalidLength(raw.len()));
    }
    let (body, check) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if sha256d(body)[..CHECKSUM_LEN] != *check {
        return Err(AddressError::ChecksumMismatch);
    }
    Ok(body)
}

pub fn decode_address(raw: &[u8], expected: Network) -> Result<AddressPayload, AddressError> {
    let body = verify_check(raw)?;
    let (&version, hash) = body
        .split_first()
        .ok_or(AddressError::InvalidLength(raw.len()))?;
    let prefixes = expected.params().base58;
    let kind = if version == prefixes.pubkey_hash {
        AddressKind::PubkeyHash
    } else if version == prefixes.script_hash {
        AddressKind::ScriptHash
    } else {
        return Err(AddressError::UnknownVersion(version));
    };
    Ok(AddressPayload {
        kind,
        network: expected,
        hash_bytes: hash.to_vec(),
    })
}

/// Wallet-import form of a private key.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
    pub network: Network,
    pub key: [u8; 32],
    pub compressed: bool,
}

impl core::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecretKey")
            .field("network", &self.network)
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

#[must_use]
pub fn encode_secret_key(sk: &SecretKey) -> String {
    let mut payload = sk.key.to_vec();
    if sk.compressed {
        payload.push(0x01);
    }
    encode_check(sk.network.params().base58.secret_key, &payload)
}

pub fn decode_secret_key(s: &str, expected: Network) -> Result<SecretKey, AddressError> {
    let raw = bs58::decode(s)
        .into_vec()
        .map_err(|_| AddressError::InvalidBase58)?;
    let body = verify_check(&raw)?;
    let (&version, rest) = body
        .split_first()
        .ok_or(AddressError::InvalidLength(raw.len()))?;
    if version != expected.params().base58.secret_key {
        return Err(AddressError::UnknownVersion(version));
    }
    let (key, compressed) = match rest {
        [key @ .., 0x01] if key.len() == 32 => (key, true),
        key if key.len() == 32 => (key, false),
        _ => return Err(AddressError::InvalidLength(raw.len())),
    };
    let mut out = [0u8; 32];
    out.copy_from_slice(key);
    Ok(SecretKey {
        network: expected,
        key: out,
        compressed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitcoin_genesis_address_vector() {
        // Satoshi's genesis output address: version 0, known hash160.
        let hash = hex::decode("62e907b15cbf27d5425399ebf6f0fb50ebb88f18").unwrap();
        assert_eq!(encode_check(0, &hash), "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
    }

    #[test]
    fn checksum_is_verified() {
        let s = encode_check(25, &[9; 20]);
        let mut raw = bs58::decode(&s).into_vec().unwrap();
        raw[24] ^= 1;
        assert_eq!(decode_address(&raw, Network::Main), Err(AddressError::ChecksumMismatch));
    }

    #[test]
    fn secret_keys_round_trip_and_stay_on_network() {
        for compressed in [false, true] {
            let sk = SecretKey {
                network: Network::Main,
                key: [0x42; 32],
                compressed,
            };
            let s = encode_secret_key(&sk);
            assert_eq!(decode_secret_key(&s, Network::Main), Ok(sk));
            assert_eq!(
                decode_secret_key(&s, Network::Test),
                Err(AddressError::UnknownVersion(128))
            );
        }
    }

    #[test]
    fn secret_key_debug_hides_key() {
        let sk = SecretKey {
            network: Network::Regtest,
            key: [0xab; 32],
            compressed: true,
        };
        assert!(!format!("{sk:?}").contains("171"));
    }
}
