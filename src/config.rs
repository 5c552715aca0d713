//! Node configuration loaded from TOML.

use std::fs;
use std::path::Path;

use botcoin_params::Network;
use botcoin_pow::DEFAULT_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};

use crate::errors::{ConsensusError, ConsensusResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    #[serde(default = "default_network")]
    pub network: Network,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Extra BIP14 comments appended to the user agent.
    #[serde(default)]
    pub user_agent_comments: Vec<String>,
    #[serde(default)]
    pub pow: PowConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PowConfig {
    #[serde(default = "default_cache_capacity")]
    pub context_cache_capacity: usize,
    /// `0` means one thread per core.
    #[serde(default)]
    pub mining_threads: usize,
    #[serde(default)]
    pub mining_deadline_ms: Option<u64>,
}

const fn default_network() -> Network {
    Network::Regtest
}

fn default_log_filter() -> String {
    "info".to_owned()
}

const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            context_cache_capacity: default_cache_capacity(),
            mining_threads: 0,
            mining_deadline_ms: None,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            log_filter: default_log_filter(),
            user_agent_comments: Vec::new(),
            pow: PowConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_toml_str(content: &str) -> ConsensusResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|err| ConsensusError::Config(format!("unable to parse config: {err}")))?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConsensusResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConsensusError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> ConsensusResult<String> {
        toml::to_string_pretty(self)
            .map_err(|err| ConsensusError::Config(format!("unable to encode config: {err}")))
    }

    fn check(&self) -> ConsensusResult<()> {
        if self.pow.context_cache_capacity == 0 {
            return Err(ConsensusError::Config(
                "pow.context_cache_capacity must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// User agent with the configured comments.
    pub fn user_agent(&self) -> ConsensusResult<String> {
        let comments: Vec<&str> = self.user_agent_comments.iter().map(String::as_str).collect();
        Ok(botcoin_netid::user_agent(
            botcoin_netid::CLIENT_NAME,
            botcoin_netid::CLIENT_VERSION,
            &comments,
        )?)
    }
}
