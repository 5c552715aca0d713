#![no_main]

use botcoin_address::{decode, encode};
use botcoin_params::Network;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = core::str::from_utf8(data) else { return };
    for network in Network::ALL {
        // Anything that decodes must re-encode to an address that decodes the same.
        if let Ok(payload) = decode(s, network) {
            let again = encode(&payload).expect("decoded payload encodes");
            assert_eq!(decode(&again, network).ok(), Some(payload));
        }
    }
});
