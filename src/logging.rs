//! Subscriber setup for binaries and tests.

use tracing_subscriber::EnvFilter;

use crate::errors::{ConsensusError, ConsensusResult};

/// Install a `fmt` subscriber. `RUST_LOG`, when set and valid, overrides
/// `filter`. Fails if a global subscriber is already installed.
pub fn init(filter: &str) -> ConsensusResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|err| ConsensusError::Config(format!("invalid log filter {filter:?}: {err}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| ConsensusError::Logging(err.to_string()))
}
