//! Ordered registry of network upgrades and their consensus branch ids.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::UpgradeError;

/// Number of upgrades known to this node, including the base epoch
pub const MAX_NETWORK_UPGRADES: usize = 10;

/// Stable index of a network upgrade in activation order.
///
/// The discriminant is the ordinal used by [`UpgradeRegistry`], the Equihash parameter
/// table and [`crate::ActivationSchedule`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum UpgradeIndex {
    /// The network at launch. Always active, never an activation.
    Sprout = 0,
    TestDummy = 1,
    Overwinter = 2,
    Sapling = 3,
    Ycash = 4,
    Blossom = 5,
    Heartwood = 6,
    Canopy = 7,
    Nu5 = 8,
    /// Integration testing only
    ZFuture = 9,
}

impl UpgradeIndex {
    /// Every upgrade, in activation order
    pub const ALL: [UpgradeIndex; MAX_NETWORK_UPGRADES] = [
        UpgradeIndex::Sprout,
        UpgradeIndex::TestDummy,
        UpgradeIndex::Overwinter,
        UpgradeIndex::Sapling,
        UpgradeIndex::Ycash,
        UpgradeIndex::Blossom,
        UpgradeIndex::Heartwood,
        UpgradeIndex::Canopy,
        UpgradeIndex::Nu5,
        UpgradeIndex::ZFuture,
    ];

    pub const fn as_usize(self) -> usize {
        self as usize
    }

    /// Registry entry for this upgrade
    pub fn info(self) -> &'static Upgrade {
        UpgradeRegistry::global().get(self.as_usize())
    }

    pub fn branch_id(self) -> u32 {
        self.info().branch_id
    }
}

impl TryFrom<usize> for UpgradeIndex {
    type Error = UpgradeError;

    fn try_from(ordinal: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .get(ordinal)
            .copied()
            .ok_or(UpgradeError::UnknownOrdinal(ordinal))
    }
}

impl fmt::Display for UpgradeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}

/// General information about a network upgrade
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Upgrade {
    /// Consensus branch id committed to by transaction signature digests
    pub branch_id: u32,
    /// User-facing name
    pub name: &'static str,
    /// User-facing description
    pub info: &'static str,
}

/// Built-in upgrade table, ordered by [`UpgradeIndex`]
pub const NETWORK_UPGRADES: [Upgrade; MAX_NETWORK_UPGRADES] = [
    Upgrade {
        branch_id: 0,
        name: "Sprout",
        info: "The Zcash network at launch",
    },
    Upgrade {
        branch_id: 0x7473_6554,
        name: "Test dummy",
        info: "Test dummy info",
    },
    Upgrade {
        branch_id: 0x5ba8_1b19,
        name: "Overwinter",
        info: "See https://z.cash/upgrade/overwinter/ for details.",
    },
    Upgrade {
        branch_id: 0x76b8_09bb,
        name: "Sapling",
        info: "See https://z.cash/upgrade/sapling/ for details.",
    },
    Upgrade {
        branch_id: 0x374d_694f,
        name: "Ycash",
        info: "See https://y.cash for details.",
    },
    Upgrade {
        branch_id: 0x8e47_1bd6,
        name: "Blossom",
        info: "See https://z.cash/upgrade/blossom.html for details.",
    },
    Upgrade {
        branch_id: 0x6631_4da3,
        name: "Heartwood",
        info: "See https://z.cash/upgrade/heartwood/ for details.",
    },
    Upgrade {
        branch_id: 0x19bd_2d2f,
        name: "Canopy",
        info: "See https://z.cash/upgrade/canopy/ for details.",
    },
    Upgrade {
        branch_id: 0xf919_a198,
        name: "NU5",
        info: "See https://z.cash/upgrade/nu5/ for details.",
    },
    Upgrade {
        branch_id: 0xffff_ffff,
        name: "ZFUTURE",
        info: "Future network upgrade (integration testing only)",
    },
];

pub const SPROUT_BRANCH_ID: u32 = NETWORK_UPGRADES[UpgradeIndex::Sprout.as_usize()].branch_id;

/// Validated, immutable table of upgrades indexed by ordinal.
///
/// Lookups by branch id are O(N) linear scans over the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRegistry {
    upgrades: Vec<Upgrade>,
}

impl UpgradeRegistry {
    /// Build a registry, checking that the base epoch has branch id 0 and that all
    /// branch ids are distinct.
    pub fn try_new(upgrades: impl Into<Vec<Upgrade>>) -> Result<Self, UpgradeError> {
        let upgrades = upgrades.into();

        let base = upgrades.first().ok_or(UpgradeError::EmptyRegistry)?;
        if base.branch_id != 0 {
            return Err(UpgradeError::NonZeroBaseBranchId(base.branch_id));
        }

        let mut seen: HashMap<u32, usize> = HashMap::with_capacity(upgrades.len());
        for (ordinal, upgrade) in upgrades.iter().enumerate() {
            if let Some(first) = seen.insert(upgrade.branch_id, ordinal) {
                return Err(UpgradeError::DuplicateBranchId {
                    branch_id: upgrade.branch_id,
                    first,
                    second: ordinal,
                });
            }
        }

        debug!("Upgrade registry built with {} entries", upgrades.len());
        Ok(Self { upgrades })
    }

    /// Registry built from [`NETWORK_UPGRADES`], initialized on first access
    pub fn global() -> &'static UpgradeRegistry {
        static REGISTRY: OnceLock<UpgradeRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            UpgradeRegistry::try_new(NETWORK_UPGRADES)
                .expect("built-in upgrade table must be well-formed")
        })
    }

    pub fn len(&self) -> usize {
        self.upgrades.len()
    }

    /// Always false for a validated registry
    pub fn is_empty(&self) -> bool {
        self.upgrades.is_empty()
    }

    /// Upgrade at `ordinal`.
    ///
    /// Panics when `ordinal` is out of range: ordinals only come from this crate's own
    /// enumeration, so a bad one is a caller bug.
    pub fn get(&self, ordinal: usize) -> &Upgrade {
        self.try_get(ordinal).unwrap_or_else(|| {
            panic!(
                "upgrade ordinal {ordinal} out of range (registry has {} entries)",
                self.len()
            )
        })
    }

    pub fn try_get(&self, ordinal: usize) -> Option<&Upgrade> {
        self.upgrades.get(ordinal)
    }

    /// Ordinal of the upgrade owning `branch_id`, if any
    pub fn ordinal_of(&self, branch_id: u32) -> Option<usize> {
        self.upgrades
            .iter()
            .position(|upgrade| upgrade.branch_id == branch_id)
    }

    /// Branch id of the upgrade preceding the one that owns `branch_id`.
    ///
    /// The base epoch and unknown ids map to the base epoch's branch id.
    pub fn previous_branch_id(&self, branch_id: u32) -> u32 {
        let ordinal = match self.ordinal_of(branch_id) {
            Some(ordinal) if ordinal > 0 => ordinal - 1,
            _ => 0,
        };
        self.get(ordinal).branch_id
    }

    pub fn contains_branch_id(&self, branch_id: u32) -> bool {
        self.ordinal_of(branch_id).is_some()
    }

    pub fn upgrades(&self) -> &[Upgrade] {
        &self.upgrades
    }
}
