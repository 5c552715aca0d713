//! Output scripts for each address kind.

use botcoin_params::Network;
use botcoin_primitives::constants::{
    OP_0, OP_1, OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160,
};

use crate::{AddressKind, AddressPayload};

/// `P2PKH`: `DUP HASH160 <20> EQUALVERIFY CHECKSIG`; `P2SH`: `HASH160 <20> EQUAL`;
/// witness: `<version op> <program>`.
#[must_use]
pub fn script_pubkey(payload: &AddressPayload) -> Vec<u8> {
    let h = &payload.hash_bytes;
    let mut s = Vec::with_capacity(h.len() + 5);
    match payload.kind {
        AddressKind::PubkeyHash => {
            s.extend_from_slice(&[OP_DUP, OP_HASH160, h.len() as u8]);
            s.extend_from_slice(h);
            s.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        }
        AddressKind::ScriptHash => {
            s.extend_from_slice(&[OP_HASH160, h.len() as u8]);
            s.extend_from_slice(h);
            s.push(OP_EQUAL);
        }
        AddressKind::WitnessV0 => {
            s.extend_from_slice(&[OP_0, h.len() as u8]);
            s.extend_from_slice(h);
        }
        AddressKind::WitnessV1 => {
            s.extend_from_slice(&[OP_1, h.len() as u8]);
            s.extend_from_slice(h);
        }
    }
    s
}

/// Recognise a standard output script; anything else is `None`.
#[must_use]
pub fn from_script_pubkey(script: &[u8], network: Network) -> Option<AddressPayload> {
    let (kind, hash) = match script {
        [OP_DUP, OP_HASH160, 20, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] if hash.len() == 20 => {
            (AddressKind::PubkeyHash, hash)
        }
        [OP_HASH160, 20, hash @ .., OP_EQUAL] if hash.len() == 20 => (AddressKind::ScriptHash, hash),
        [OP_0, n, prog @ ..] if usize::from(*n) == prog.len() && (prog.len() == 20 || prog.len() == 32) => {
            (AddressKind::WitnessV0, prog)
        }
        [OP_1, 32, prog @ ..] if prog.len() == 32 => (AddressKind::WitnessV1, prog),
        _ => return None,
    };
    Some(AddressPayload {
        kind,
        network,
        hash_bytes: hash.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2pkh_layout() {
        let p = AddressPayload::p2pkh(Network::Main, [0x11; 20]);
        let s = script_pubkey(&p);
        assert_eq!(s.len(), 25);
        assert_eq!(&s[..3], &[0x76, 0xa9, 0x14]);
        assert_eq!(&s[23..], &[0x88, 0xac]);
        assert_eq!(from_script_pubkey(&s, Network::Main), Some(p));
    }

    #[test]
    fn unrecognised_scripts() {
        assert_eq!(from_script_pubkey(&[], Network::Main), None);
        assert_eq!(from_script_pubkey(&[0x6a, 0x01, 0x00], Network::Main), None);
        assert_eq!(from_script_pubkey(&[OP_0, 21, 0], Network::Main), None);
    }
}
