use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

use botcoin_params::REGTEST;
use botcoin_pow::{
    check_proof_of_work, genesis_seed, GenesisOnly, Miner, MiningBudget, PowEngine, PowError,
    TargetRejection,
};
use botcoin_primitives::BlockHeader;

const EASY: u32 = 0x207f_ffff;
/// Target of 1: effectively unsatisfiable.
const IMPOSSIBLE: u32 = 0x0300_0001;

fn template(bits: u32) -> BlockHeader {
    BlockHeader {
        version: 0x2000_0000,
        previous_hash: [0xaa; 32],
        merkle_root: [0xbb; 32],
        timestamp: 1_738_195_320,
        bits,
        nonce: 0,
    }
}

fn rejected_nonce(engine: &PowEngine, height: u64) -> BlockHeader {
    let mut h = template(EASY);
    loop {
        match engine.check(&h, height, &GenesisOnly) {
            Err(PowError::PowRejected { .. }) => return h,
            Ok(_) => h.nonce += 1,
            Err(e) => panic!("unexpected {e}"),
        }
    }
}

#[test]
fn mined_header_verifies_and_neighbour_may_not() {
    let engine = PowEngine::new(&REGTEST);
    let mut h = template(EASY);
    let nonce = engine
        .mine(&h, 1, &GenesisOnly, &MiningBudget::unbounded())
        .unwrap()
        .expect("easy target");
    h.nonce = nonce;
    assert!(engine.verify(&h, 1, &GenesisOnly));
    assert!(engine.check(&h, 1, &GenesisOnly).is_ok());

    let bad = rejected_nonce(&engine, 1);
    assert!(!engine.verify(&bad, 1, &GenesisOnly));
    assert_eq!(engine.cache().builds(), 1);
}

#[test]
fn check_agrees_with_target_comparison() {
    let engine = PowEngine::new(&REGTEST);
    let mut h = template(EASY);
    let (mut passed, mut failed) = (0, 0);
    for nonce in 0..64 {
        h.nonce = nonce;
        let hash = engine.pow_hash(&h, 1, &GenesisOnly).unwrap();
        let expected = check_proof_of_work(&hash, h.bits, &REGTEST);
        assert_eq!(engine.verify(&h, 1, &GenesisOnly), expected, "nonce {nonce}");
        match engine.check(&h, 1, &GenesisOnly) {
            Ok(got) => {
                assert!(expected);
                assert_eq!(got, hash);
                passed += 1;
            }
            Err(PowError::PowRejected { .. }) => {
                assert!(!expected);
                failed += 1;
            }
            Err(e) => panic!("unexpected {e}"),
        }
    }
    // Roughly half of all hashes sit under a 0x7fffff.. target.
    assert!(passed > 0 && failed > 0);
}

#[test]
fn malformed_bits_are_reported() {
    let engine = PowEngine::new(&REGTEST);
    let h = template(0x0480_0001);
    assert!(matches!(
        engine.check(&h, 1, &GenesisOnly),
        Err(PowError::InvalidDifficultyEncoding {
            reason: TargetRejection::Malformed(_),
            ..
        })
    ));
    assert!(!engine.verify(&h, 1, &GenesisOnly));
}

#[test]
fn seed_rotates_after_lag() {
    let engine = PowEngine::new(&REGTEST);
    let mut seeds = HashMap::new();
    seeds.insert(2048u64, [0x5e; 32]);
    let h = template(EASY);
    let before = engine.pow_hash(&h, 2111, &seeds).unwrap();
    let after = engine.pow_hash(&h, 2112, &seeds).unwrap();
    assert_ne!(before, after);
    assert_eq!(engine.pow_hash(&h, 4159, &seeds).unwrap(), after);
    assert_eq!(engine.cache().builds(), 2);
    assert!(engine.cache().contains(&genesis_seed()));
    assert!(engine.cache().contains(&[0x5e; 32]));
}

#[test]
fn missing_seed_block_is_an_error_not_a_fallback() {
    let engine = PowEngine::new(&REGTEST);
    let h = template(EASY);
    assert_eq!(
        engine.check(&h, 2112, &GenesisOnly),
        Err(PowError::SeedBlockMissing { height: 2048 })
    );
    assert!(!engine.verify(&h, 2112, &GenesisOnly));
}

#[test]
fn batch_matches_individual_results() {
    let engine = PowEngine::new(&REGTEST);
    let items: Vec<(BlockHeader, u64)> = (0..16u32)
        .map(|n| {
            let mut h = template(EASY);
            h.nonce = n;
            (h, 5)
        })
        .collect();
    let batch = engine.verify_batch(&items, &GenesisOnly);
    let single: Vec<bool> = items
        .iter()
        .map(|(h, height)| engine.verify(h, *height, &GenesisOnly))
        .collect();
    assert_eq!(batch, single);
    assert!(batch.iter().any(|ok| *ok));
}

#[test]
fn mining_times_out() {
    let engine = PowEngine::new(&REGTEST);
    let budget = MiningBudget::with_timeout(Duration::from_millis(50));
    let out = engine.mine(&template(IMPOSSIBLE), 1, &GenesisOnly, &budget);
    assert_eq!(out, Ok(None));
}

#[test]
fn cancelled_mining_returns_promptly() {
    let engine = PowEngine::new(&REGTEST);
    let budget = MiningBudget::unbounded();
    let handle = budget.cancel_handle();
    let t = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        handle.store(true, Ordering::Release);
    });
    let out = engine.mine(&template(IMPOSSIBLE), 1, &GenesisOnly, &budget);
    t.join().unwrap();
    assert_eq!(out, Ok(None));

    let pre = MiningBudget::unbounded();
    pre.cancel();
    assert_eq!(engine.mine(&template(EASY), 1, &GenesisOnly, &pre), Ok(None));
}

#[test]
fn threaded_miner_finds_a_valid_nonce() {
    let engine = PowEngine::new(&REGTEST);
    let miner = Miner::new(4).unwrap();
    let mut h = template(0x2000_ffff);
    let nonce = miner
        .mine(&engine, &h, 3, &GenesisOnly, &MiningBudget::with_timeout(Duration::from_secs(60)))
        .unwrap()
        .expect("nonce within budget");
    h.nonce = nonce;
    assert!(engine.verify(&h, 3, &GenesisOnly));
    let stats = miner.stats();
    assert_eq!(stats.blocks_found, 1);
    assert!(stats.hashes >= 1);
    assert_eq!(stats.threads, 4);
}

#[test]
fn threaded_miner_respects_cancel() {
    let engine = PowEngine::new(&REGTEST);
    let miner = Miner::new(2).unwrap();
    let budget = MiningBudget::with_timeout(Duration::from_millis(30));
    let out = miner.mine(&engine, &template(IMPOSSIBLE), 3, &GenesisOnly, &budget);
    assert_eq!(out, Ok(None));
    assert_eq!(miner.stats().blocks_found, 0);
}
