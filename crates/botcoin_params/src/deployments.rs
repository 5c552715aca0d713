//! Soft-fork activation table.
//!
//! Every rule set the chain enforces is active from height 0; blocks signal
//! that with the version-bits top bits. The table keeps the per-rule heights
//! explicit so later deployments slot in without touching callers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentName {
    Bip34,
    Bip65,
    Bip66,
    Csv,
    Segwit,
    Taproot,
    TestDummy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub name: DeploymentName,
    /// Version bit used for signalling, if any.
    pub bit: Option<u8>,
    /// `None` means never active.
    pub activation_height: Option<u64>,
}

impl Deployment {
    #[must_use]
    pub const fn is_active_at(&self, height: u64) -> bool {
        match self.activation_height {
            Some(h) => height >= h,
            None => false,
        }
    }
}

const fn buried(name: DeploymentName) -> Deployment {
    Deployment {
        name,
        bit: None,
        activation_height: Some(0),
    }
}

pub static DEPLOYMENTS: [Deployment; 7] = [
    buried(DeploymentName::Bip34),
    buried(DeploymentName::Bip65),
    buried(DeploymentName::Bip66),
    buried(DeploymentName::Csv),
    buried(DeploymentName::Segwit),
    Deployment {
        name: DeploymentName::Taproot,
        bit: Some(2),
        activation_height: Some(0),
    },
    Deployment {
        name: DeploymentName::TestDummy,
        bit: Some(28),
        activation_height: None,
    },
];
