//! Typed queries over one selected network.

use std::sync::Arc;
use std::time::Duration;

use botcoin_address::{validate_address, AddressValidation};
use botcoin_netid::{IdentityGate, NetworkInfo};
use botcoin_params::ConsensusParams;
use botcoin_pow::{Miner, MiningBudget, PowEngine, PowHash, SeedBlockSource};
use botcoin_primitives::constants::{COIN, NULL_HASH};
use botcoin_primitives::{to_display_hex, Block, BlockHeader};
use serde::Serialize;

use crate::config::NodeConfig;
use crate::errors::ConsensusResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxOutInfo {
    pub value_coins: f64,
    pub script_hex: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxInfo {
    pub txid: String,
    /// Input script of the coinbase; `None` for other transactions.
    pub coinbase_hex: Option<String>,
    pub outputs: Vec<TxOutInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockInfo {
    pub hash: String,
    pub height: u64,
    pub version: i32,
    /// Absent for the genesis block.
    pub previous_hash: Option<String>,
    pub merkle_root: String,
    pub time: u32,
    pub bits: String,
    pub nonce: u32,
    pub transactions: Vec<TxInfo>,
}

#[allow(clippy::cast_precision_loss)]
fn coins(value: i64) -> f64 {
    value as f64 / COIN as f64
}

impl BlockInfo {
    #[must_use]
    pub fn new(block: &Block, height: u64) -> Self {
        let header = &block.header;
        Self {
            hash: to_display_hex(&block.hash()),
            height,
            version: header.version,
            previous_hash: (header.previous_hash != NULL_HASH)
                .then(|| to_display_hex(&header.previous_hash)),
            merkle_root: to_display_hex(&header.merkle_root),
            time: header.timestamp,
            bits: format!("{:08x}", header.bits),
            nonce: header.nonce,
            transactions: block
                .transactions
                .iter()
                .map(|tx| TxInfo {
                    txid: to_display_hex(&tx.txid()),
                    coinbase_hex: tx
                        .is_coinbase()
                        .then(|| hex::encode(&tx.inputs[0].script_sig)),
                    outputs: tx
                        .outputs
                        .iter()
                        .map(|o| TxOutInfo {
                            value_coins: coins(o.value),
                            script_hex: hex::encode(&o.script_pubkey),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Registry, genesis, PoW engine and identity gate for one network.
pub struct ConsensusCore {
    params: &'static ConsensusParams,
    config: NodeConfig,
    engine: Arc<PowEngine>,
    gate: IdentityGate,
    genesis: Block,
}

impl ConsensusCore {
    pub fn from_config(config: NodeConfig) -> ConsensusResult<Self> {
        let params = botcoin_params::select(config.network.as_str())?;
        let genesis = botcoin_genesis::build(params);
        botcoin_genesis::validate(&genesis, params)?;
        let gate = IdentityGate::new(params, &config.user_agent()?)?;
        let engine = Arc::new(PowEngine::with_cache_capacity(
            params,
            config.pow.context_cache_capacity,
        ));
        tracing::info!(
            network = %params.network,
            magic = %params.magic_hex(),
            genesis = %to_display_hex(&genesis.hash()),
            "consensus core ready"
        );
        Ok(Self {
            params,
            config,
            engine,
            gate,
            genesis,
        })
    }

    #[must_use]
    pub const fn params(&self) -> &'static ConsensusParams {
        self.params
    }

    #[must_use]
    pub const fn config(&self) -> &NodeConfig {
        &self.config
    }

    #[must_use]
    pub fn engine(&self) -> Arc<PowEngine> {
        Arc::clone(&self.engine)
    }

    #[must_use]
    pub const fn gate(&self) -> &IdentityGate {
        &self.gate
    }

    #[must_use]
    pub const fn genesis(&self) -> &Block {
        &self.genesis
    }

    #[must_use]
    pub fn block_info(&self, block: &Block, height: u64) -> BlockInfo {
        BlockInfo::new(block, height)
    }

    /// The height-0 query.
    #[must_use]
    pub fn genesis_info(&self) -> BlockInfo {
        BlockInfo::new(&self.genesis, 0)
    }

    #[must_use]
    pub fn network_info(&self, connections: usize) -> NetworkInfo {
        self.gate.network_info(connections)
    }

    #[must_use]
    pub fn validate_address(&self, address: &str) -> AddressValidation {
        validate_address(address, self.params.network)
    }

    /// Proof-of-work check of a header at `height`.
    pub fn verify_header<S: SeedBlockSource + ?Sized>(
        &self,
        header: &BlockHeader,
        height: u64,
        seeds: &S,
    ) -> ConsensusResult<PowHash> {
        Ok(self.engine.check(header, height, seeds)?)
    }

    fn budget(&self) -> MiningBudget {
        self.config
            .pow
            .mining_deadline_ms
            .map_or_else(MiningBudget::unbounded, |ms| {
                MiningBudget::with_timeout(Duration::from_millis(ms))
            })
    }

    /// Search a nonce for `template` with the configured threads and deadline.
    /// `Ok(None)` when the deadline passes first.
    pub fn mine_header<S: SeedBlockSource + Sync + ?Sized>(
        &self,
        template: &BlockHeader,
        height: u64,
        seeds: &S,
    ) -> ConsensusResult<Option<BlockHeader>> {
        let threads = match self.config.pow.mining_threads {
            0 => std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            n => n,
        };
        let miner = Miner::new(threads)?;
        let found = miner.mine(&self.engine, template, height, seeds, &self.budget())?;
        let stats = miner.stats();
        tracing::info!(
            height,
            hashes = stats.hashes,
            rate = miner.hash_rate(),
            found = found.is_some(),
            "mining finished"
        );
        Ok(found.map(|nonce| BlockHeader { nonce, ..*template }))
    }
}

impl core::fmt::Debug for ConsensusCore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConsensusCore")
            .field("network", &self.params.network)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

