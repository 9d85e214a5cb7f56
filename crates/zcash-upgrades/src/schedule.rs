//! Per-network activation heights, indexed by upgrade ordinal.

use tracing::{debug, warn};

/// Activation height of every upgrade on one network.
///
/// `None` marks an upgrade that is disabled on this network. The base epoch (ordinal 0)
/// is always scheduled at height 0 by the builder. Enabled heights are expected to be
/// non-decreasing by ordinal; the resolver relies on it but never re-checks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationSchedule {
    heights: Vec<Option<u32>>,
}

impl ActivationSchedule {
    /// Schedule from raw per-ordinal heights
    pub fn from_heights(heights: Vec<Option<u32>>) -> Self {
        Self { heights }
    }

    /// Builder for a schedule covering `len` upgrades, with only the base epoch active
    pub fn builder(len: usize) -> ActivationScheduleBuilder {
        ActivationScheduleBuilder::new(len)
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Configured activation height of the upgrade at `ordinal`, `None` when disabled.
    ///
    /// Panics when `ordinal` is out of range.
    pub fn activation_height(&self, ordinal: usize) -> Option<u32> {
        match self.heights.get(ordinal) {
            Some(height) => *height,
            None => panic!(
                "upgrade ordinal {ordinal} out of range (schedule has {} entries)",
                self.len()
            ),
        }
    }

    pub fn heights(&self) -> &[Option<u32>] {
        &self.heights
    }

    /// Whether the enabled heights never decrease by ordinal.
    ///
    /// Disabled upgrades never activate, so they are skipped and may sit anywhere,
    /// including between two enabled ones.
    pub fn is_monotonic(&self) -> bool {
        let enabled: Vec<u32> = self.heights.iter().flatten().copied().collect();
        enabled.windows(2).all(|pair| pair[0] <= pair[1])
    }
}

/// Incrementally configures an [`ActivationSchedule`]
#[derive(Debug, Clone)]
pub struct ActivationScheduleBuilder {
    heights: Vec<Option<u32>>,
}

impl ActivationScheduleBuilder {
    fn new(len: usize) -> Self {
        let mut heights = vec![None; len];
        if let Some(base) = heights.first_mut() {
            *base = Some(0);
        }
        Self { heights }
    }

    /// Schedule the upgrade at `ordinal` to activate at `height`
    pub fn activate(mut self, ordinal: usize, height: u32) -> Self {
        *self.slot(ordinal) = Some(height);
        self
    }

    /// Disable the upgrade at `ordinal` on this network
    pub fn disable(mut self, ordinal: usize) -> Self {
        *self.slot(ordinal) = None;
        self
    }

    pub fn build(self) -> ActivationSchedule {
        let schedule = ActivationSchedule::from_heights(self.heights);
        if !schedule.is_monotonic() {
            warn!(
                "Activation heights decrease by ordinal, current epoch is ill-defined: {:?}",
                schedule.heights()
            );
        }
        debug!("Activation schedule built: {:?}", schedule.heights());
        schedule
    }

    fn slot(&mut self, ordinal: usize) -> &mut Option<u32> {
        let len = self.heights.len();
        self.heights.get_mut(ordinal).unwrap_or_else(|| {
            panic!("upgrade ordinal {ordinal} out of range (schedule has {len} entries)")
        })
    }
}
