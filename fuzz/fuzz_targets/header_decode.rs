#![no_main]

use botcoin_primitives::{Block, BlockHeader, Transaction};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(h) = BlockHeader::deserialize(data) {
        assert_eq!(&h.serialize()[..], data);
    }
    if let Ok(tx) = Transaction::deserialize(data) {
        assert_eq!(tx.serialize(), data);
    }
    if let Ok(block) = Block::deserialize(data) {
        assert_eq!(block.serialize(), data);
    }
});
