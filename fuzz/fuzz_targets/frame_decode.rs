#![no_main]

use botcoin_netid::{parse_frame, IdentityGate, VersionMessage};
use botcoin_params::Network;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(gate) = IdentityGate::new(Network::Main.params(), "/Botcoin:0.1.0/") else { return };
    if let Ok((_, payload)) = parse_frame(&gate, data) {
        let _ = VersionMessage::deserialize(payload);
    }
    let _ = VersionMessage::deserialize(data);
});
