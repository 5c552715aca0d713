use std::path::PathBuf;

use botcoin_address::AddressError;
use botcoin_genesis::GenesisError;
use botcoin_netid::IdentityError;
use botcoin_params::ParamsError;
use botcoin_pow::PowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error(transparent)]
    Genesis(#[from] GenesisError),

    #[error(transparent)]
    Pow(#[from] PowError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("unable to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("logging already initialised: {0}")]
    Logging(String),
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;
