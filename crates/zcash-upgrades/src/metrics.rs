//! Operational counters, a shared mining timer and upgrade countdown helpers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::epoch::{network_upgrade_active, next_activation_height};
use crate::registry::UpgradeIndex;
use crate::schedule::ActivationSchedule;

/// Target block spacing in seconds before Blossom activates
pub const PRE_BLOSSOM_POW_TARGET_SPACING: i64 = 150;
/// Target block spacing in seconds once Blossom is active
pub const POST_BLOSSOM_POW_TARGET_SPACING: i64 = 75;

/// Lock-free counter that can be shared between threads
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Idle,
    Running { count: u64, started_at: Instant },
}

#[derive(Debug)]
struct TimerInner {
    state: TimerState,
    total: Duration,
}

/// Wall-clock timer shared by overlapping workers.
///
/// The first `start` begins an interval, later ones only bump the reference count.
/// The interval ends when `stop` has been called as many times as `start`.
#[derive(Debug)]
pub struct AtomicTimer {
    inner: Mutex<TimerInner>,
}

impl Default for AtomicTimer {
    fn default() -> Self {
        Self {
            inner: Mutex::new(TimerInner {
                state: TimerState::Idle,
                total: Duration::ZERO,
            }),
        }
    }
}

impl AtomicTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        self.start_at(Instant::now());
    }

    /// Extra calls while idle are ignored
    pub fn stop(&self) {
        self.stop_at(Instant::now());
    }

    pub fn running(&self) -> bool {
        matches!(self.lock().state, TimerState::Running { .. })
    }

    /// Number of outstanding `start` calls
    pub fn thread_count(&self) -> u64 {
        match self.lock().state {
            TimerState::Idle => 0,
            TimerState::Running { count, .. } => count,
        }
    }

    /// Total time spent running, including the current interval
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    /// Events per second of running time, 0 if the timer never ran
    pub fn rate(&self, counter: &AtomicCounter) -> f64 {
        rate_over(counter.get(), self.elapsed())
    }

    fn start_at(&self, now: Instant) {
        let mut inner = self.lock();
        let state = inner.state;
        inner.state = match state {
            TimerState::Idle => TimerState::Running {
                count: 1,
                started_at: now,
            },
            TimerState::Running { count, started_at } => TimerState::Running {
                count: count + 1,
                started_at,
            },
        };
    }

    fn stop_at(&self, now: Instant) {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            TimerState::Idle => {}
            TimerState::Running { count: 1, started_at } => {
                inner.total += now.saturating_duration_since(started_at);
                inner.state = TimerState::Idle;
            }
            TimerState::Running { count, started_at } => {
                inner.state = TimerState::Running {
                    count: count - 1,
                    started_at,
                };
            }
        }
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        let inner = self.lock();
        match inner.state {
            TimerState::Idle => inner.total,
            TimerState::Running { started_at, .. } => {
                inner.total + now.saturating_duration_since(started_at)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn rate_over(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// Target block spacing in seconds at `height`
pub fn pow_target_spacing(height: i32, schedule: &ActivationSchedule) -> i64 {
    if network_upgrade_active(height, schedule, UpgradeIndex::Blossom) {
        POST_BLOSSOM_POW_TARGET_SPACING
    } else {
        PRE_BLOSSOM_POW_TARGET_SPACING
    }
}

/// Blocks left before the next scheduled upgrade activates
pub fn blocks_until_next_upgrade(height: i32, schedule: &ActivationSchedule) -> Option<u32> {
    let next = next_activation_height(height, schedule)?;
    Some(next - u32::try_from(height).ok()?)
}

/// Estimated seconds until the next scheduled upgrade activates
pub fn seconds_left_to_next_epoch(height: i32, schedule: &ActivationSchedule) -> Option<i64> {
    let next = next_activation_height(height, schedule)?;
    let blocks = next - u32::try_from(height).ok()?;
    // Spacing in force at the last block before the upgrade
    let last_block = i32::try_from(next - 1).unwrap_or(i32::MAX);
    Some(i64::from(blocks) * pow_target_spacing(last_block, schedule))
}
