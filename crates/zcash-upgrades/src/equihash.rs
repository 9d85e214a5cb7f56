//! Equihash proof-of-work parameters per network upgrade.

use serde::{Deserialize, Serialize};

use crate::registry::{UpgradeIndex, MAX_NETWORK_UPGRADES};

/// Equihash `(n, k)` parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EquihashParams {
    pub n: u32,
    pub k: u32,
}

impl EquihashParams {
    /// Parameters used from launch until the Ycash upgrade
    pub const DEFAULT: EquihashParams = EquihashParams { n: 200, k: 9 };
    /// Parameters introduced by the Ycash proof-of-work change
    pub const YCASH: EquihashParams = EquihashParams { n: 192, k: 7 };

    /// Number of bits per collision index
    pub const fn collision_bit_length(&self) -> u32 {
        self.n / (self.k + 1)
    }

    /// Length in bytes of a serialized solution (`2^k` indices of `n/(k+1) + 1` bits each)
    pub const fn solution_len(&self) -> usize {
        ((1usize << self.k) * (self.collision_bit_length() as usize + 1)) / 8
    }

    /// Parameters for the upgrade at `ordinal`.
    ///
    /// Panics when `ordinal` is out of range.
    pub fn for_ordinal(ordinal: usize) -> EquihashParams {
        match EQUIHASH_PARAMS.get(ordinal) {
            Some(params) => *params,
            None => panic!("upgrade ordinal {ordinal} has no Equihash parameters"),
        }
    }
}

impl Default for EquihashParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Ordered by [`UpgradeIndex`]. Each upgrade lists its parameters explicitly.
const EQUIHASH_PARAMS: [EquihashParams; MAX_NETWORK_UPGRADES] = [
    // Sprout
    EquihashParams::DEFAULT,
    // Test dummy
    EquihashParams::DEFAULT,
    // Overwinter
    EquihashParams::DEFAULT,
    // Sapling
    EquihashParams::DEFAULT,
    // Ycash
    EquihashParams::YCASH,
    // Blossom
    EquihashParams::YCASH,
    // Heartwood
    EquihashParams::YCASH,
    // Canopy
    EquihashParams::YCASH,
    // NU5
    EquihashParams::YCASH,
    // ZFUTURE
    EquihashParams::YCASH,
];

/// Equihash parameters introduced with `idx`
pub fn equihash_params(idx: UpgradeIndex) -> EquihashParams {
    EQUIHASH_PARAMS[idx.as_usize()]
}
