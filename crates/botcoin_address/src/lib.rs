#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! Botcoin address codec.
//!
//! Legacy payloads (pubkey-hash, script-hash) use Base58Check with the
//! network's version bytes; witness programs use Bech32 (v0) or Bech32m (v1)
//! under the network's human-readable part. Decoding is total: every input
//! yields a payload or a named error, and a payload is only returned for the
//! network the caller expects.

use botcoin_params::Network;
use serde::Serialize;
use thiserror::Error;

mod base58;
mod script;
mod segwit;

pub use base58::{decode_secret_key, encode_secret_key, SecretKey};
pub use script::{from_script_pubkey, script_pubkey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("base58check checksum mismatch")]
    ChecksumMismatch,
    #[error("unknown base58 version byte {0}")]
    UnknownVersion(u8),
    #[error("invalid base58 string")]
    InvalidBase58,
    #[error("invalid payload length {0}")]
    InvalidLength(usize),
    #[error("invalid bech32 checksum")]
    InvalidChecksum,
    #[error("wrong human-readable part: expected {expected:?}, found {found:?}")]
    WrongHumanReadablePart { expected: String, found: String },
    #[error("unsupported witness version {0}")]
    UnsupportedWitnessVersion(u8),
    #[error("invalid witness program")]
    InvalidWitnessProgram,
    #[error("invalid bech32 string")]
    InvalidBech32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    PubkeyHash,
    ScriptHash,
    WitnessV0,
    WitnessV1,
}

impl AddressKind {
    /// Admissible `hash_bytes` lengths.
    #[must_use]
    pub const fn valid_len(self, len: usize) -> bool {
        match self {
            Self::PubkeyHash | Self::ScriptHash => len == 20,
            Self::WitnessV0 => len == 20 || len == 32,
            Self::WitnessV1 => len == 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressPayload {
    pub kind: AddressKind,
    pub network: Network,
    pub hash_bytes: Vec<u8>,
}

impl AddressPayload {
    #[must_use]
    pub fn p2pkh(network: Network, hash: [u8; 20]) -> Self {
        Self {
            kind: AddressKind::PubkeyHash,
            network,
            hash_bytes: hash.to_vec(),
        }
    }

    #[must_use]
    pub fn p2sh(network: Network, hash: [u8; 20]) -> Self {
        Self {
            kind: AddressKind::ScriptHash,
            network,
            hash_bytes: hash.to_vec(),
        }
    }

    #[must_use]
    pub fn p2wpkh(network: Network, hash: [u8; 20]) -> Self {
        Self {
            kind: AddressKind::WitnessV0,
            network,
            hash_bytes: hash.to_vec(),
        }
    }

    #[must_use]
    pub fn p2wsh(network: Network, hash: [u8; 32]) -> Self {
        Self {
            kind: AddressKind::WitnessV0,
            network,
            hash_bytes: hash.to_vec(),
        }
    }

    #[must_use]
    pub fn p2tr(network: Network, key: [u8; 32]) -> Self {
        Self {
            kind: AddressKind::WitnessV1,
            network,
            hash_bytes: key.to_vec(),
        }
    }
}

/// Render a payload for its network.
pub fn encode(payload: &AddressPayload) -> Result<String, AddressError> {
    if !payload.kind.valid_len(payload.hash_bytes.len()) {
        return Err(AddressError::InvalidLength(payload.hash_bytes.len()));
    }
    let params = payload.network.params();
    match payload.kind {
        AddressKind::PubkeyHash => Ok(base58::encode_check(
            params.base58.pubkey_hash,
            &payload.hash_bytes,
        )),
        AddressKind::ScriptHash => Ok(base58::encode_check(
            params.base58.script_hash,
            &payload.hash_bytes,
        )),
        AddressKind::WitnessV0 => segwit::encode(params.bech32_hrp, 0, &payload.hash_bytes),
        AddressKind::WitnessV1 => segwit::encode(params.bech32_hrp, 1, &payload.hash_bytes),
    }
}

/// Parse `s` as an address of `expected`. Never coerces across networks.
pub fn decode(s: &str, expected: Network) -> Result<AddressPayload, AddressError> {
    let result = decode_inner(s, expected);
    if let Err(e) = &result {
        tracing::debug!(network = %expected, error = %e, "address rejected");
    }
    result
}

fn decode_inner(s: &str, expected: Network) -> Result<AddressPayload, AddressError> {
    let params = expected.params();
    if segwit::has_hrp_prefix(s, params.bech32_hrp) {
        return segwit::decode(s, expected);
    }
    match bs58::decode(s).into_vec() {
        Ok(raw) if raw.len() == base58::CHECKED_LEN => base58::decode_address(&raw, expected),
        other => {
            if segwit::looks_like_bech32(s) {
                return segwit::decode(s, expected);
            }
            match other {
                Ok(raw) => Err(AddressError::InvalidLength(raw.len())),
                Err(_) => Err(AddressError::InvalidBase58),
            }
        }
    }
}

/// Outcome of an address check, shaped for the RPC collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressValidation {
    pub address: String,
    pub is_valid: bool,
    pub kind: Option<AddressKind>,
    pub error: Option<String>,
}

#[must_use]
pub fn validate_address(s: &str, network: Network) -> AddressValidation {
    match decode(s, network) {
        Ok(p) => AddressValidation {
            address: s.to_owned(),
            is_valid: true,
            kind: Some(p.kind),
            error: None,
        },
        Err(e) => AddressValidation {
            address: s.to_owned(),
            is_valid: false,
            kind: None,
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_rejects_wrong_lengths() {
        let mut p = AddressPayload::p2pkh(Network::Main, [1; 20]);
        p.hash_bytes.pop();
        assert_eq!(encode(&p), Err(AddressError::InvalidLength(19)));
        let mut p = AddressPayload::p2tr(Network::Main, [1; 32]);
        p.hash_bytes.truncate(20);
        assert_eq!(encode(&p), Err(AddressError::InvalidLength(20)));
        let mut p = AddressPayload::p2wsh(Network::Test, [1; 32]);
        p.hash_bytes.push(0);
        assert_eq!(encode(&p), Err(AddressError::InvalidLength(33)));
    }

    #[test]
    fn garbage_is_named() {
        assert_eq!(decode("", Network::Main), Err(AddressError::InvalidLength(0)));
        assert_eq!(decode("0OIl", Network::Main), Err(AddressError::InvalidBase58));
        assert!(matches!(
            decode("abc", Network::Main),
            Err(AddressError::InvalidLength(_))
        ));
    }

    #[test]
    fn validation_reports_kind_and_error() {
        let a = encode(&AddressPayload::p2wpkh(Network::Regtest, [7; 20])).unwrap();
        let ok = validate_address(&a, Network::Regtest);
        assert!(ok.is_valid);
        assert_eq!(ok.kind, Some(AddressKind::WitnessV0));
        let bad = validate_address(&a, Network::Main);
        assert!(!bad.is_valid);
        assert!(bad.error.unwrap().contains("human-readable"));
    }
}
