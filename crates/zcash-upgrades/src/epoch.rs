//! Epoch resolution: which upgrade is in force at a height, and where the next boundary is.
//!
//! Heights are `i32` chain heights. [`EpochResolver::state`] and everything built on it
//! treat a negative height as a caller bug and panic. Navigation helpers
//! ([`EpochResolver::next_epoch`], [`EpochResolver::next_activation_height`]) and the
//! activation-boundary predicates answer `None`/`false` instead, because their heights
//! can come from estimates rather than the validated chain tip.
//!
//! Every query is a linear scan over the registry, O(N) in the number of upgrades.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::equihash::EquihashParams;
use crate::registry::{UpgradeIndex, UpgradeRegistry};
use crate::schedule::ActivationSchedule;
use crate::UpgradeError;

/// State of a single upgrade at a given height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeState {
    /// Not scheduled on this network
    Disabled,
    /// Scheduled, activation height not reached yet
    Pending,
    /// Scheduled and activation height reached
    Active,
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeState::Disabled => f.write_str("disabled"),
            UpgradeState::Pending => f.write_str("pending"),
            UpgradeState::Active => f.write_str("active"),
        }
    }
}

/// Queries over one registry and one activation schedule
#[derive(Debug, Clone, Copy)]
pub struct EpochResolver<'a> {
    registry: &'a UpgradeRegistry,
    schedule: &'a ActivationSchedule,
}

impl<'a> EpochResolver<'a> {
    /// Pair a registry with a schedule covering exactly its upgrades
    pub fn new(
        registry: &'a UpgradeRegistry,
        schedule: &'a ActivationSchedule,
    ) -> Result<Self, UpgradeError> {
        if registry.len() != schedule.len() {
            return Err(UpgradeError::ScheduleLengthMismatch {
                registry: registry.len(),
                schedule: schedule.len(),
            });
        }
        Ok(Self { registry, schedule })
    }

    /// Resolver over the built-in registry.
    ///
    /// Panics when `schedule` was not built for the built-in registry.
    pub fn global(schedule: &'a ActivationSchedule) -> Self {
        match Self::new(UpgradeRegistry::global(), schedule) {
            Ok(resolver) => resolver,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn registry(&self) -> &'a UpgradeRegistry {
        self.registry
    }

    pub fn schedule(&self) -> &'a ActivationSchedule {
        self.schedule
    }

    /// State of the upgrade at `ordinal` at `height`.
    ///
    /// Panics on a negative height or an out-of-range ordinal.
    pub fn state(&self, height: i32, ordinal: usize) -> UpgradeState {
        let height = checked_height(height);
        self.check_ordinal(ordinal);

        match self.schedule.activation_height(ordinal) {
            None => UpgradeState::Disabled,
            // The block at the activation height is the first one under the new rules;
            // the block just below it is the last common block with the old branch.
            Some(activation) if height >= activation => UpgradeState::Active,
            Some(_) => UpgradeState::Pending,
        }
    }

    pub fn is_active(&self, height: i32, ordinal: usize) -> bool {
        self.state(height, ordinal) == UpgradeState::Active
    }

    /// Ordinal of the highest active upgrade at `height`, or the base epoch.
    ///
    /// Scanning from the top means a non-decreasing schedule needs no extra ordering
    /// check.
    pub fn current_epoch(&self, height: i32) -> usize {
        (0..self.registry.len())
            .rev()
            .find(|&ordinal| self.is_active(height, ordinal))
            .unwrap_or(0)
    }

    /// Consensus branch id in force at `height`
    pub fn current_branch_id(&self, height: i32) -> u32 {
        self.registry.get(self.current_epoch(height)).branch_id
    }

    /// Branch id of the upgrade preceding the one that owns `branch_id`.
    ///
    /// Unknown ids and the base epoch fall back to the base epoch's branch id.
    pub fn previous_branch_id(&self, branch_id: u32) -> u32 {
        self.registry.previous_branch_id(branch_id)
    }

    pub fn is_consensus_branch_id(&self, branch_id: u32) -> bool {
        self.registry.contains_branch_id(branch_id)
    }

    /// Whether `height` is exactly the activation height of the upgrade at `ordinal`.
    ///
    /// Always false for the base epoch and for negative heights. Panics on an
    /// out-of-range ordinal.
    pub fn is_activation_height(&self, height: i32, ordinal: usize) -> bool {
        self.check_ordinal(ordinal);
        if ordinal == 0 {
            return false;
        }
        match u32::try_from(height) {
            Ok(height) => self.schedule.activation_height(ordinal) == Some(height),
            Err(_) => false,
        }
    }

    /// Whether `height` activates any upgrade other than the base epoch
    pub fn is_activation_height_for_any_upgrade(&self, height: i32) -> bool {
        let Ok(height) = u32::try_from(height) else {
            return false;
        };
        (1..self.registry.len())
            .any(|ordinal| self.schedule.activation_height(ordinal) == Some(height))
    }

    /// Lowest-ordinal upgrade still pending at `height`. Never the base epoch.
    pub fn next_epoch(&self, height: i32) -> Option<usize> {
        if height < 0 {
            return None;
        }
        (1..self.registry.len())
            .find(|&ordinal| self.state(height, ordinal) == UpgradeState::Pending)
    }

    /// Activation height of [`Self::next_epoch`]
    pub fn next_activation_height(&self, height: i32) -> Option<u32> {
        self.next_epoch(height)
            .and_then(|ordinal| self.schedule.activation_height(ordinal))
    }

    fn check_ordinal(&self, ordinal: usize) {
        assert!(
            ordinal < self.registry.len(),
            "upgrade ordinal {ordinal} out of range (registry has {} entries)",
            self.registry.len()
        );
    }
}

fn checked_height(height: i32) -> u32 {
    match u32::try_from(height) {
        Ok(height) => height,
        Err(_) => panic!("block height must be non-negative, got {height}"),
    }
}

fn to_index(ordinal: usize) -> UpgradeIndex {
    UpgradeIndex::ALL[ordinal]
}

/// State of `idx` at `height` on `schedule`. Panics on a negative height.
pub fn network_upgrade_state(
    height: i32,
    schedule: &ActivationSchedule,
    idx: UpgradeIndex,
) -> UpgradeState {
    EpochResolver::global(schedule).state(height, idx.as_usize())
}

pub fn network_upgrade_active(
    height: i32,
    schedule: &ActivationSchedule,
    idx: UpgradeIndex,
) -> bool {
    network_upgrade_state(height, schedule, idx) == UpgradeState::Active
}

/// Upgrade in force at `height`
pub fn current_epoch(height: i32, schedule: &ActivationSchedule) -> UpgradeIndex {
    to_index(EpochResolver::global(schedule).current_epoch(height))
}

/// Consensus branch id to commit to in transactions mined at `height`
pub fn current_epoch_branch_id(height: i32, schedule: &ActivationSchedule) -> u32 {
    EpochResolver::global(schedule).current_branch_id(height)
}

/// Branch id of the epoch before the one owning `branch_id`.
///
/// Depends only on registry order, so no schedule is needed.
pub fn prev_epoch_branch_id(branch_id: u32) -> u32 {
    UpgradeRegistry::global().previous_branch_id(branch_id)
}

pub fn is_consensus_branch_id(branch_id: u32) -> bool {
    UpgradeRegistry::global().contains_branch_id(branch_id)
}

pub fn is_activation_height(
    height: i32,
    schedule: &ActivationSchedule,
    idx: UpgradeIndex,
) -> bool {
    EpochResolver::global(schedule).is_activation_height(height, idx.as_usize())
}

pub fn is_activation_height_for_any_upgrade(height: i32, schedule: &ActivationSchedule) -> bool {
    EpochResolver::global(schedule).is_activation_height_for_any_upgrade(height)
}

/// Next scheduled upgrade after `height`, `None` for negative heights
pub fn next_epoch(height: i32, schedule: &ActivationSchedule) -> Option<UpgradeIndex> {
    EpochResolver::global(schedule).next_epoch(height).map(to_index)
}

pub fn next_activation_height(height: i32, schedule: &ActivationSchedule) -> Option<u32> {
    EpochResolver::global(schedule).next_activation_height(height)
}

/// Equihash parameters of the epoch in force at `height`
pub fn current_equihash_params(height: i32, schedule: &ActivationSchedule) -> EquihashParams {
    EquihashParams::for_ordinal(EpochResolver::global(schedule).current_epoch(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Upgrade, MAX_NETWORK_UPGRADES, SPROUT_BRANCH_ID};

    fn upgrade(branch_id: u32, name: &'static str) -> Upgrade {
        Upgrade {
            branch_id,
            name,
            info: "",
        }
    }

    fn fixture_registry() -> UpgradeRegistry {
        UpgradeRegistry::try_new(vec![
            upgrade(0, "base"),
            upgrade(0xaaaa, "first"),
            upgrade(0xbbbb, "second"),
            upgrade(0xcccc, "third"),
        ])
        .unwrap()
    }

    fn fixture_schedule() -> ActivationSchedule {
        ActivationSchedule::builder(4)
            .activate(1, 100)
            .activate(2, 200)
            .build()
    }

    fn zcash_schedule() -> ActivationSchedule {
        ActivationSchedule::builder(MAX_NETWORK_UPGRADES)
            .activate(UpgradeIndex::Overwinter.as_usize(), 10)
            .activate(UpgradeIndex::Sapling.as_usize(), 20)
            .activate(UpgradeIndex::Ycash.as_usize(), 30)
            .activate(UpgradeIndex::Blossom.as_usize(), 30)
            .build()
    }

    #[test]
    fn test_state_transitions() {
        let registry = fixture_registry();
        let schedule = fixture_schedule();
        let resolver = EpochResolver::new(&registry, &schedule).unwrap();

        assert_eq!(resolver.state(0, 0), UpgradeState::Active);
        assert_eq!(resolver.state(99, 1), UpgradeState::Pending);
        assert_eq!(resolver.state(100, 1), UpgradeState::Active);
        assert_eq!(resolver.state(101, 1), UpgradeState::Active);
        assert_eq!(resolver.state(1_000_000, 3), UpgradeState::Disabled);
    }

    #[test]
    fn test_length_mismatch() {
        let registry = fixture_registry();
        let schedule = ActivationSchedule::builder(3).build();
        assert_eq!(
            EpochResolver::new(&registry, &schedule).unwrap_err(),
            UpgradeError::ScheduleLengthMismatch {
                registry: 4,
                schedule: 3,
            }
        );
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn test_state_rejects_negative_height() {
        let registry = fixture_registry();
        let schedule = fixture_schedule();
        EpochResolver::new(&registry, &schedule).unwrap().state(-1, 1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_state_rejects_unknown_ordinal() {
        let registry = fixture_registry();
        let schedule = fixture_schedule();
        EpochResolver::new(&registry, &schedule).unwrap().state(0, 4);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_activation_height_rejects_unknown_ordinal() {
        let registry = fixture_registry();
        let schedule = fixture_schedule();
        EpochResolver::new(&registry, &schedule)
            .unwrap()
            .is_activation_height(100, 4);
    }

    #[test]
    fn test_previous_branch_id_fallbacks() {
        let registry = fixture_registry();
        let schedule = fixture_schedule();
        let resolver = EpochResolver::new(&registry, &schedule).unwrap();

        assert_eq!(resolver.previous_branch_id(0xcccc), 0xbbbb);
        assert_eq!(resolver.previous_branch_id(0xaaaa), 0);
        assert_eq!(resolver.previous_branch_id(0), 0);
        assert_eq!(resolver.previous_branch_id(0xdead), 0);
    }

    #[test]
    fn test_negative_heights_degrade() {
        let registry = fixture_registry();
        let schedule = fixture_schedule();
        let resolver = EpochResolver::new(&registry, &schedule).unwrap();

        assert_eq!(resolver.next_epoch(-1), None);
        assert_eq!(resolver.next_activation_height(-1), None);
        assert!(!resolver.is_activation_height(-1, 1));
        assert!(!resolver.is_activation_height_for_any_upgrade(-1));
    }

    #[test]
    fn test_base_epoch_is_never_an_activation() {
        let registry = fixture_registry();
        let schedule = fixture_schedule();
        let resolver = EpochResolver::new(&registry, &schedule).unwrap();

        assert!(!resolver.is_activation_height(0, 0));
        assert!(!resolver.is_activation_height_for_any_upgrade(0));
        assert_eq!(resolver.next_epoch(0), Some(1));
    }

    #[test]
    fn test_global_queries() {
        let schedule = zcash_schedule();

        assert_eq!(current_epoch(9, &schedule), UpgradeIndex::Sprout);
        assert_eq!(current_epoch_branch_id(9, &schedule), SPROUT_BRANCH_ID);
        assert_eq!(current_epoch(10, &schedule), UpgradeIndex::Overwinter);
        assert_eq!(current_epoch(29, &schedule), UpgradeIndex::Sapling);
        // Ycash and Blossom share a height, the higher ordinal wins
        assert_eq!(current_epoch(30, &schedule), UpgradeIndex::Blossom);
        assert_eq!(
            current_epoch_branch_id(30, &schedule),
            UpgradeIndex::Blossom.branch_id()
        );

        assert_eq!(
            network_upgrade_state(5, &schedule, UpgradeIndex::TestDummy),
            UpgradeState::Disabled
        );
        assert!(network_upgrade_active(20, &schedule, UpgradeIndex::Sapling));
        assert!(!network_upgrade_active(19, &schedule, UpgradeIndex::Sapling));

        assert_eq!(next_epoch(0, &schedule), Some(UpgradeIndex::Overwinter));
        assert_eq!(next_epoch(20, &schedule), Some(UpgradeIndex::Ycash));
        assert_eq!(next_activation_height(20, &schedule), Some(30));
        assert_eq!(next_epoch(30, &schedule), None);

        assert!(is_activation_height(30, &schedule, UpgradeIndex::Ycash));
        assert!(is_activation_height(30, &schedule, UpgradeIndex::Blossom));
        assert!(!is_activation_height(31, &schedule, UpgradeIndex::Blossom));
        assert!(is_activation_height_for_any_upgrade(10, &schedule));
        assert!(!is_activation_height_for_any_upgrade(11, &schedule));
    }

    #[test]
    fn test_prev_epoch_branch_id_follows_registry_order() {
        assert_eq!(
            prev_epoch_branch_id(UpgradeIndex::Sapling.branch_id()),
            UpgradeIndex::Overwinter.branch_id()
        );
        assert_eq!(
            prev_epoch_branch_id(UpgradeIndex::Overwinter.branch_id()),
            UpgradeIndex::TestDummy.branch_id()
        );
        assert_eq!(prev_epoch_branch_id(SPROUT_BRANCH_ID), SPROUT_BRANCH_ID);
        assert_eq!(prev_epoch_branch_id(0x1234_5678), SPROUT_BRANCH_ID);
        assert!(is_consensus_branch_id(UpgradeIndex::Ycash.branch_id()));
        assert!(!is_consensus_branch_id(0x1234_5678));
    }

    #[test]
    fn test_current_equihash_params() {
        let schedule = zcash_schedule();
        assert_eq!(current_equihash_params(29, &schedule), EquihashParams::DEFAULT);
        assert_eq!(current_equihash_params(30, &schedule), EquihashParams::YCASH);
    }

    #[test]
    #[should_panic(expected = "Activation schedule has 4 entries")]
    fn test_global_resolver_rejects_foreign_schedule() {
        current_epoch(0, &fixture_schedule());
    }
}
