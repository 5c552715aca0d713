//! Print (and optionally re-mine) the genesis block of a network.

use std::path::PathBuf;

use anyhow::{Context, Result};
use botcoin_consensus::pow::GenesisOnly;
use botcoin_consensus::primitives::to_display_hex;
use botcoin_consensus::{logging, ConsensusCore, Network, NodeConfig};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about = "Inspect the Botcoin genesis block")]
struct Cli {
    /// TOML config; flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// main, test or regtest.
    #[arg(short, long)]
    network: Option<Network>,
    /// Search a genesis nonce that satisfies the proof of work.
    #[arg(long, default_value_t = false)]
    mine: bool,
    #[arg(long)]
    deadline_ms: Option<u64>,
    #[arg(long)]
    threads: Option<usize>,
    /// Print the block as JSON-like debug output instead of a summary.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(ms) = cli.deadline_ms {
        config.pow.mining_deadline_ms = Some(ms);
    }
    if let Some(threads) = cli.threads {
        config.pow.mining_threads = threads;
    }
    logging::init(&config.log_filter)?;

    let core = ConsensusCore::from_config(config).context("building consensus core")?;
    let params = core.params();
    let info = core.genesis_info();

    println!("network      {}", params.network);
    println!("magic        {}", params.magic_hex());
    println!("port         {}", params.default_port);
    println!("hash         {}", info.hash);
    println!("merkle root  {}", info.merkle_root);
    println!("time         {}", info.time);
    println!("bits         {}", info.bits);
    println!("nonce        {}", info.nonce);
    if cli.verbose {
        println!("{info:#?}");
    }

    if cli.mine {
        let template = core.genesis().header;
        match core.mine_header(&template, 0, &GenesisOnly)? {
            Some(header) => {
                println!("mined nonce  {}", header.nonce);
                println!("mined hash   {}", to_display_hex(&header.hash()));
            }
            None => println!("no nonce found before the deadline"),
        }
    }
    Ok(())
}
