//! Witness-program addresses: `hrp ‖ 1 ‖ version ‖ program ‖ checksum`.
//! Version 0 uses Bech32, version 1 Bech32m.

use bech32::primitives::decode::UncheckedHrpstring;
use bech32::{Bech32, Bech32m, Fe32, Hrp};
use botcoin_params::Network;

use crate::{AddressError, AddressKind, AddressPayload};

pub fn encode(hrp: &str, version: u8, program: &[u8]) -> Result<String, AddressError> {
    let hrp = Hrp::parse(hrp).map_err(|_| AddressError::InvalidBech32)?;
    let version = Fe32::try_from(version).map_err(|_| AddressError::UnsupportedWitnessVersion(version))?;
    bech32::segwit::encode(hrp, version, program).map_err(|_| AddressError::InvalidWitnessProgram)
}

/// Case-insensitive `hrp1` prefix test.
pub fn has_hrp_prefix(s: &str, hrp: &str) -> bool {
    s.len() > hrp.len()
        && s.is_char_boundary(hrp.len())
        && s[..hrp.len()].eq_ignore_ascii_case(hrp)
        && s.as_bytes()[hrp.len()] == b'1'
}

pub fn looks_like_bech32(s: &str) -> bool {
    UncheckedHrpstring::new(s).is_ok()
}

pub fn decode(s: &str, expected: Network) -> Result<AddressPayload, AddressError> {
    let unchecked = UncheckedHrpstring::new(s).map_err(|_| AddressError::InvalidBech32)?;
    let expected_hrp = expected.params().bech32_hrp;
    let found = unchecked.hrp().to_lowercase();
    if found != expected_hrp {
        return Err(AddressError::WrongHumanReadablePart {
            expected: expected_hrp.to_owned(),
            found,
        });
    }

    let is_bech32 = unchecked.has_valid_checksum::<Bech32>();
    let is_bech32m = unchecked.has_valid_checksum::<Bech32m>();
    if !is_bech32 && !is_bech32m {
        return Err(AddressError::InvalidChecksum);
    }

    let version = witness_version(s)?;
    let kind = match version {
        0 if is_bech32 => AddressKind::WitnessV0,
        1 if is_bech32m => AddressKind::WitnessV1,
        0 | 1 => return Err(AddressError::InvalidChecksum),
        v => return Err(AddressError::UnsupportedWitnessVersion(v)),
    };

    let (_, _, program) =
        bech32::segwit::decode(s).map_err(|_| AddressError::InvalidWitnessProgram)?;
    if !kind.valid_len(program.len()) {
        return Err(AddressError::InvalidWitnessProgram);
    }
    Ok(AddressPayload {
        kind,
        network: expected,
        hash_bytes: program,
    })
}

/// First character of the data part.
fn witness_version(s: &str) -> Result<u8, AddressError> {
    let sep = s.rfind('1').ok_or(AddressError::InvalidBech32)?;
    let c = s[sep + 1..]
        .chars()
        .next()
        .ok_or(AddressError::InvalidWitnessProgram)?;
    Fe32::from_char(c.to_ascii_lowercase())
        .map(Fe32::to_u8)
        .map_err(|_| AddressError::InvalidBech32)
}
