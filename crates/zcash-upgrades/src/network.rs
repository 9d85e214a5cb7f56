//! Built-in networks and their activation schedules.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::registry::{UpgradeIndex, MAX_NETWORK_UPGRADES};
use crate::schedule::ActivationSchedule;
use crate::UpgradeError;

/// Network a node is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    /// Local regression-test network, only the base epoch is scheduled
    Regtest,
}

impl Network {
    /// Activation schedule of this network, built on first access
    pub fn activation_schedule(self) -> &'static ActivationSchedule {
        static MAINNET: OnceLock<ActivationSchedule> = OnceLock::new();
        static TESTNET: OnceLock<ActivationSchedule> = OnceLock::new();
        static REGTEST: OnceLock<ActivationSchedule> = OnceLock::new();

        match self {
            Network::Mainnet => MAINNET.get_or_init(|| {
                ActivationSchedule::builder(MAX_NETWORK_UPGRADES)
                    .activate(UpgradeIndex::Overwinter.as_usize(), 347_500)
                    .activate(UpgradeIndex::Sapling.as_usize(), 419_200)
                    .activate(UpgradeIndex::Ycash.as_usize(), 570_000)
                    .build()
            }),
            Network::Testnet => TESTNET.get_or_init(|| {
                ActivationSchedule::builder(MAX_NETWORK_UPGRADES)
                    .activate(UpgradeIndex::Overwinter.as_usize(), 207_500)
                    .activate(UpgradeIndex::Sapling.as_usize(), 280_000)
                    .build()
            }),
            Network::Regtest => {
                REGTEST.get_or_init(|| ActivationSchedule::builder(MAX_NETWORK_UPGRADES).build())
            }
        }
    }
}

impl FromStr for Network {
    type Err = UpgradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Mainnet),
            "test" | "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(UpgradeError::UnknownNetwork(s.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
            Network::Regtest => f.write_str("regtest"),
        }
    }
}
