//! Network upgrade activation and consensus branch id resolution.
//!
//! This crate answers "which consensus rules apply at this height" for a Zcash-family
//! node. It is made of four layers:
//! 1. **Registry**: the fixed, ordered table of network upgrades and their branch ids
//! 2. **Equihash parameters**: per-upgrade proof-of-work parameters aligned to the registry
//! 3. **Activation schedule**: per-network activation heights, supplied by [`Network`]
//! 4. **Epoch resolver**: pure queries mapping `(height, schedule)` to upgrade state,
//!    current/previous/next epoch and activation boundaries
//!
//! All queries are side-effect free and can be called concurrently from any thread.

use thiserror::Error;

pub mod epoch;
pub mod equihash;
pub mod metrics;
pub mod network;
pub mod registry;
pub mod schedule;

pub use epoch::{
    current_epoch, current_epoch_branch_id, current_equihash_params, is_activation_height,
    is_activation_height_for_any_upgrade, is_consensus_branch_id, network_upgrade_active,
    network_upgrade_state, next_activation_height, next_epoch, prev_epoch_branch_id,
    EpochResolver, UpgradeState,
};
pub use equihash::{equihash_params, EquihashParams};
pub use metrics::{
    blocks_until_next_upgrade, pow_target_spacing, seconds_left_to_next_epoch, AtomicCounter,
    AtomicTimer,
};
pub use network::Network;
pub use registry::{
    Upgrade, UpgradeIndex, UpgradeRegistry, MAX_NETWORK_UPGRADES, NETWORK_UPGRADES,
    SPROUT_BRANCH_ID,
};
pub use schedule::{ActivationSchedule, ActivationScheduleBuilder};

/// Errors raised while building registries and schedules at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpgradeError {
    /// Ordinal does not name a registered upgrade
    #[error("Unknown network upgrade ordinal: {0}")]
    UnknownOrdinal(usize),
    /// Registry contains no upgrades at all
    #[error("Upgrade registry must contain at least the base epoch")]
    EmptyRegistry,
    /// Base epoch must carry the zero branch id
    #[error("Base epoch branch id must be 0, got {0:#010x}")]
    NonZeroBaseBranchId(u32),
    /// Two upgrades share a branch id
    #[error("Duplicate consensus branch id {branch_id:#010x} at ordinals {first} and {second}")]
    DuplicateBranchId {
        branch_id: u32,
        first: usize,
        second: usize,
    },
    /// Schedule does not cover every registered upgrade
    #[error("Activation schedule has {schedule} entries, registry has {registry}")]
    ScheduleLengthMismatch { registry: usize, schedule: usize },
    /// Network name not recognized
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
}
