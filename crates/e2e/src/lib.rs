#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! In-memory Botcoin node used by the end-to-end tests.
//!
//! A `Node` owns a chain that starts at the built-in genesis block, a UTXO
//! set, a mempool, a tiny deterministic wallet, a `PowEngine` and an
//! `IdentityGate` with its connection table. Blocks are mined for real
//! against the seed-rotating hash; nothing touches a socket.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use botcoin_address::{AddressError, AddressPayload};
use botcoin_genesis::{push_height, GenesisError};
use botcoin_netid::{
    default_user_agent, frame, Command, ConnectionTable, HandshakeState, IdentityError,
    IdentityGate, NetAddress, NetworkInfo, PeerId,
};
use botcoin_params::{ConsensusParams, Network};
use botcoin_pow::{next_work_required, BlockSummary, MiningBudget, PowEngine, PowError, SeedBlockSource};
use botcoin_primitives::constants::{MAX_MONEY, SEQUENCE_FINAL, VERSIONBITS_TOP_BITS};
use botcoin_primitives::{
    sha256d, to_display_hex, Amount, Block, BlockHeader, Hash256, OutPoint, Transaction, TxIn,
    TxOut,
};
use thiserror::Error;

/// Fee attached to every wallet payment, collected by the next coinbase.
pub const PAYMENT_FEE: Amount = 10_000;

const MINING_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Pow(#[from] PowError),
    #[error(transparent)]
    Genesis(#[from] GenesisError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("block rejected: {0}")]
    BlockRejected(&'static str),
    #[error("no nonce found within the mining budget")]
    MiningExhausted,
    #[error("insufficient funds: need {needed}, spendable {available}")]
    InsufficientFunds { needed: Amount, available: Amount },
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("handshake did not complete: {0}")]
    HandshakeIncomplete(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Coin {
    output: TxOut,
    height: u64,
    coinbase: bool,
}

pub struct Node {
    params: &'static ConsensusParams,
    engine: PowEngine,
    gate: IdentityGate,
    connections: ConnectionTable,
    chain: Vec<Block>,
    hashes: Vec<Hash256>,
    tx_heights: HashMap<Hash256, u64>,
    utxos: HashMap<OutPoint, Coin>,
    mempool: Vec<Transaction>,
    wallet: HashSet<Vec<u8>>,
    key_counter: u64,
}

impl Node {
    /// Node on `network` holding only the genesis block.
    pub fn new(network: Network) -> Result<Self, NodeError> {
        Self::with_user_agent(network, &default_user_agent())
    }

    pub fn with_user_agent(network: Network, user_agent: &str) -> Result<Self, NodeError> {
        let params = network.params();
        let genesis = botcoin_genesis::build(params);
        botcoin_genesis::validate(&genesis, params)?;
        let genesis_hash = genesis.hash();
        let mut tx_heights = HashMap::new();
        for tx in &genesis.transactions {
            tx_heights.insert(tx.txid(), 0);
        }
        tracing::info!(
            network = %network,
            genesis = %to_display_hex(&genesis_hash),
            "node initialised"
        );
        // The genesis output is an OP_RETURN and never enters the UTXO set.
        Ok(Self {
            params,
            engine: PowEngine::new(params),
            gate: IdentityGate::new(params, user_agent)?,
            connections: ConnectionTable::new(),
            chain: vec![genesis],
            hashes: vec![genesis_hash],
            tx_heights,
            utxos: HashMap::new(),
            mempool: Vec::new(),
            wallet: HashSet::new(),
            key_counter: 0,
        })
    }

    #[must_use]
    pub const fn params(&self) -> &'static ConsensusParams {
        self.params
    }

    #[must_use]
    pub const fn engine(&self) -> &PowEngine {
        &self.engine
    }

    #[must_use]
    pub const fn gate(&self) -> &IdentityGate {
        &self.gate
    }

    #[must_use]
    pub const fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    /// Height of the tip; the genesis block is height 0.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.chain.len() as u64 - 1
    }

    #[must_use]
    pub fn tip_hash(&self) -> Hash256 {
        self.hashes[self.hashes.len() - 1]
    }

    #[must_use]
    pub fn block_at(&self, height: u64) -> Option<&Block> {
        self.chain.get(usize::try_from(height).ok()?)
    }

    #[must_use]
    pub fn mempool(&self) -> &[Transaction] {
        &self.mempool
    }

    /// Fresh wallet address (P2WPKH over a deterministic 20-byte key hash).
    pub fn new_address(&mut self) -> Result<String, NodeError> {
        self.key_counter += 1;
        let mut material = self.params.network_magic.to_vec();
        material.extend_from_slice(&self.key_counter.to_le_bytes());
        let digest = sha256d(&material);
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&digest[..20]);
        let payload = AddressPayload::p2wpkh(self.params.network, hash);
        self.wallet.insert(botcoin_address::script_pubkey(&payload));
        Ok(botcoin_address::encode(&payload)?)
    }

    fn script_for(&self, address: &str) -> Result<Vec<u8>, NodeError> {
        let payload = botcoin_address::decode(address, self.params.network)?;
        Ok(botcoin_address::script_pubkey(&payload))
    }

    fn summaries(&self) -> Vec<BlockSummary> {
        let window = self.params.difficulty_window + 1;
        let start = self.chain.len().saturating_sub(window);
        self.chain[start..]
            .iter()
            .enumerate()
            .map(|(i, b)| BlockSummary {
                height: (start + i) as u64,
                timestamp: b.header.timestamp,
                bits: b.header.bits,
            })
            .collect()
    }

    /// `bits` the next block must carry.
    #[must_use]
    pub fn next_bits(&self) -> u32 {
        next_work_required(&self.summaries(), self.params)
    }

    fn mempool_fees(&self) -> Amount {
        self.mempool.iter().map(|tx| self.fee_of(tx).unwrap_or(0)).sum()
    }

    fn fee_of(&self, tx: &Transaction) -> Option<Amount> {
        let mut inputs: Amount = 0;
        for input in &tx.inputs {
            inputs = inputs.checked_add(self.utxos.get(&input.previous_output)?.output.value)?;
        }
        inputs.checked_sub(tx.total_output()?)
    }

    /// Assemble the next block paying `payout` and carrying the mempool.
    #[must_use]
    pub fn block_template(&self, payout: &[u8]) -> Block {
        let height = self.height() + 1;
        let mut script_sig = Vec::new();
        push_height(&mut script_sig, height);
        let coinbase = Transaction {
            version: 1,
            inputs: vec![TxIn {
                previous_output: OutPoint::NULL,
                script_sig,
                sequence: SEQUENCE_FINAL,
            }],
            outputs: vec![TxOut {
                value: self.params.block_subsidy(height) + self.mempool_fees(),
                script_pubkey: payout.to_vec(),
            }],
            lock_time: 0,
        };
        let mut transactions = vec![coinbase];
        transactions.extend(self.mempool.iter().cloned());
        let tip = &self.chain[self.chain.len() - 1];
        let spacing = u32::try_from(self.params.pow_target_spacing).unwrap_or(u32::MAX);
        let mut block = Block {
            header: BlockHeader {
                version: VERSIONBITS_TOP_BITS,
                previous_hash: self.tip_hash(),
                merkle_root: [0u8; 32],
                timestamp: tip.header.timestamp.saturating_add(spacing),
                bits: self.next_bits(),
                nonce: 0,
            },
            transactions,
        };
        block.header.merkle_root = block.compute_merkle_root();
        block
    }

    /// Mine `count` blocks paying `address`; returns their hashes.
    pub fn generate_to_address(&mut self, count: usize, address: &str) -> Result<Vec<Hash256>, NodeError> {
        let payout = self.script_for(address)?;
        let mut mined = Vec::with_capacity(count);
        for _ in 0..count {
            let mut block = self.block_template(&payout);
            let height = self.height() + 1;
            let budget = MiningBudget::with_timeout(MINING_TIMEOUT);
            let nonce = self
                .engine
                .mine(&block.header, height, &self.hashes, &budget)?
                .ok_or(NodeError::MiningExhausted)?;
            block.header.nonce = nonce;
            mined.push(block.hash());
            self.submit_block(block)?;
        }
        Ok(mined)
    }

    /// Validate `block` as the next block and connect it.
    pub fn submit_block(&mut self, block: Block) -> Result<(), NodeError> {
        let height = self.height() + 1;
        if block.header.previous_hash != self.tip_hash() {
            return Err(NodeError::BlockRejected("does not extend the tip"));
        }
        if block.header.bits != self.next_bits() {
            return Err(NodeError::BlockRejected("unexpected difficulty bits"));
        }
        self.engine.check(&block.header, height, &self.hashes)?;
        if block.compute_merkle_root() != block.header.merkle_root {
            return Err(NodeError::BlockRejected("merkle root mismatch"));
        }
        let Some((coinbase, rest)) = block.transactions.split_first() else {
            return Err(NodeError::BlockRejected("no transactions"));
        };
        if !coinbase.is_coinbase() || rest.iter().any(Transaction::is_coinbase) {
            return Err(NodeError::BlockRejected("coinbase must be first and only"));
        }
        if botcoin_genesis::read_height(&coinbase.inputs[0].script_sig) != Some(height) {
            return Err(NodeError::BlockRejected("coinbase height mismatch"));
        }

        let mut spent: HashSet<OutPoint> = HashSet::new();
        let mut fees: Amount = 0;
        for tx in rest {
            let mut value_in: Amount = 0;
            for input in &tx.inputs {
                let op = input.previous_output;
                let coin = self
                    .utxos
                    .get(&op)
                    .ok_or(NodeError::BlockRejected("missing or spent input"))?;
                if !spent.insert(op) {
                    return Err(NodeError::BlockRejected("double spend within block"));
                }
                if coin.coinbase && height - coin.height < self.params.coinbase_maturity {
                    return Err(NodeError::BlockRejected("immature coinbase spend"));
                }
                value_in += coin.output.value;
            }
            let value_out = tx
                .total_output()
                .ok_or(NodeError::BlockRejected("output overflow"))?;
            if value_out > MAX_MONEY || value_out > value_in {
                return Err(NodeError::BlockRejected("outputs exceed inputs"));
            }
            fees += value_in - value_out;
        }
        let claimed = coinbase
            .total_output()
            .ok_or(NodeError::BlockRejected("output overflow"))?;
        if claimed > self.params.block_subsidy(height) + fees {
            return Err(NodeError::BlockRejected("coinbase pays too much"));
        }

        self.connect_block(block, height);
        Ok(())
    }

    fn connect_block(&mut self, block: Block, height: u64) {
        let hash = block.hash();
        let mut confirmed = HashSet::new();
        for (i, tx) in block.transactions.iter().enumerate() {
            let txid = tx.txid();
            for input in &tx.inputs {
                self.utxos.remove(&input.previous_output);
            }
            for (index, output) in tx.outputs.iter().enumerate() {
                self.utxos.insert(
                    OutPoint {
                        txid,
                        index: u32::try_from(index).unwrap_or(u32::MAX),
                    },
                    Coin {
                        output: output.clone(),
                        height,
                        coinbase: i == 0,
                    },
                );
            }
            self.tx_heights.insert(txid, height);
            confirmed.insert(txid);
        }
        self.mempool.retain(|tx| !confirmed.contains(&tx.txid()));
        tracing::info!(
            height,
            hash = %to_display_hex(&hash),
            txs = block.transactions.len(),
            "block connected"
        );
        self.chain.push(block);
        self.hashes.push(hash);
    }

    fn spendable(&self) -> Vec<(OutPoint, Amount)> {
        let reserved: HashSet<OutPoint> = self
            .mempool
            .iter()
            .flat_map(|tx| tx.inputs.iter().map(|i| i.previous_output))
            .collect();
        let tip = self.height();
        let mut coins: Vec<(OutPoint, &Coin)> = self
            .utxos
            .iter()
            .filter(|(op, c)| {
                self.wallet.contains(&c.output.script_pubkey)
                    && !reserved.contains(*op)
                    && (!c.coinbase || tip - c.height >= self.params.coinbase_maturity)
            })
            .map(|(op, c)| (*op, c))
            .collect();
        coins.sort_by_key(|(op, c)| (c.height, op.txid, op.index));
        coins.into_iter().map(|(op, c)| (op, c.output.value)).collect()
    }

    /// Mature, unreserved wallet funds.
    #[must_use]
    pub fn balance(&self) -> Amount {
        self.spendable().iter().map(|(_, v)| v).sum()
    }

    /// Wallet funds still waiting for coinbase maturity.
    #[must_use]
    pub fn immature_balance(&self) -> Amount {
        let tip = self.height();
        self.utxos
            .values()
            .filter(|c| {
                self.wallet.contains(&c.output.script_pubkey)
                    && c.coinbase
                    && tip - c.height < self.params.coinbase_maturity
            })
            .map(|c| c.output.value)
            .sum()
    }

    /// Pay `amount` to `address` from mature wallet coins; the transaction
    /// waits in the mempool until the next block.
    pub fn send_to_address(&mut self, address: &str, amount: Amount) -> Result<Hash256, NodeError> {
        if amount <= 0 {
            return Err(NodeError::InvalidAmount);
        }
        let destination = self.script_for(address)?;
        let needed = amount + PAYMENT_FEE;
        let mut selected = Vec::new();
        let mut total: Amount = 0;
        for (op, value) in self.spendable() {
            if total >= needed {
                break;
            }
            selected.push(op);
            total += value;
        }
        if total < needed {
            return Err(NodeError::InsufficientFunds {
                needed,
                available: total,
            });
        }
        let mut outputs = vec![TxOut {
            value: amount,
            script_pubkey: destination,
        }];
        let change = total - needed;
        if change > 0 {
            let change_address = self.new_address()?;
            outputs.push(TxOut {
                value: change,
                script_pubkey: self.script_for(&change_address)?,
            });
        }
        let tx = Transaction {
            version: 2,
            inputs: selected
                .into_iter()
                .map(|previous_output| TxIn {
                    previous_output,
                    script_sig: Vec::new(),
                    sequence: SEQUENCE_FINAL,
                })
                .collect(),
            outputs,
            lock_time: 0,
        };
        let txid = tx.txid();
        tracing::info!(txid = %to_display_hex(&txid), amount, "payment queued");
        self.mempool.push(tx);
        Ok(txid)
    }

    /// `Some(0)` while in the mempool, depth once mined, `None` if unknown.
    #[must_use]
    pub fn confirmations(&self, txid: &Hash256) -> Option<u64> {
        if let Some(h) = self.tx_heights.get(txid) {
            return Some(self.height() - h + 1);
        }
        self.mempool.iter().any(|tx| tx.txid() == *txid).then_some(0)
    }

    fn version_frame(&self, nonce: u64) -> Vec<u8> {
        let receiver = NetAddress::ipv4(0, [127, 0, 0, 1], self.params.default_port);
        let start_height = i32::try_from(self.height()).unwrap_or(i32::MAX);
        let msg = self.gate.version_message(receiver, nonce, 0, start_height);
        frame(self.gate.magic(), Command::VERSION, &msg.serialize())
    }

    /// Run a full version/verack exchange between `self` and `other` over an
    /// in-memory pipe. On failure both sides keep the connection in its
    /// rejected state.
    pub fn connect(&self, other: &Self) -> Result<(PeerId, PeerId), NodeError> {
        let local = self.connections.open();
        let remote = other.connections.open();
        let mut pipe: VecDeque<(bool, Vec<u8>)> = VecDeque::new();
        pipe.push_back((true, self.version_frame(local)));
        pipe.push_back((false, other.version_frame(remote)));
        while let Some((to_other, bytes)) = pipe.pop_front() {
            let replies = if to_other {
                other.connections.receive(&other.gate, remote, &bytes)?
            } else {
                self.connections.receive(&self.gate, local, &bytes)?
            };
            pipe.extend(replies.into_iter().map(|r| (!to_other, r)));
        }
        let done = matches!(self.connections.state(local), Some(HandshakeState::Established))
            && matches!(other.connections.state(remote), Some(HandshakeState::Established));
        if !done {
            return Err(NodeError::HandshakeIncomplete("exchange ended early"));
        }
        Ok((local, remote))
    }

    /// `ping`/`pong` round trip on an established connection.
    pub fn ping(&self, other: &Self, remote: PeerId, nonce: u64) -> Result<Vec<Vec<u8>>, NodeError> {
        let bytes = frame(self.gate.magic(), Command::PING, &nonce.to_le_bytes());
        Ok(other.connections.receive(&other.gate, remote, &bytes)?)
    }

    #[must_use]
    pub fn network_info(&self) -> NetworkInfo {
        self.gate.network_info(self.connections.established())
    }
}

impl SeedBlockSource for Node {
    fn block_hash_at(&self, height: u64) -> Option<Hash256> {
        self.hashes.block_hash_at(height)
    }
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Node")
            .field("network", &self.params.network)
            .field("height", &self.height())
            .field("mempool", &self.mempool.len())
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}
