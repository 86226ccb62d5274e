// src/utils/time.rs
//! Time sources for packet timestamps

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    /// Nanoseconds since an arbitrary, fixed origin
    fn now_nanos(&self) -> u64;

    fn now_micros(&self) -> u64 {
        self.now_nanos() / 1000
    }
}

/// Monotonic clock anchored at construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimeProvider {
    origin: Instant,
}

impl MonotonicTimeProvider {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MonotonicTimeProvider {
    fn now_nanos(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Mock time provider for deterministic testing
#[derive(Debug, Default)]
pub struct MockTimeProvider {
    current_time: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
        }
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn set_time(&self, nanos: u64) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.current_time.load(Ordering::Relaxed)
    }
}

/// Converts clock readings into timestamps relative to an epoch that never
/// go backwards, even if the provider does.
#[derive(Debug)]
pub struct TimestampClamp {
    epoch_nanos: u64,
    last_nanos: AtomicU64,
}

impl TimestampClamp {
    pub fn new(epoch_nanos: u64) -> Self {
        Self {
            epoch_nanos,
            last_nanos: AtomicU64::new(0),
        }
    }

    /// Elapsed time since the epoch, never smaller than the previous result
    pub fn stamp(&self, now_nanos: u64) -> Duration {
        let elapsed = now_nanos.saturating_sub(self.epoch_nanos);
        let previous = self.last_nanos.fetch_max(elapsed, Ordering::AcqRel);
        Duration::from_nanos(previous.max(elapsed))
    }
}

/// Number of samples a channel at `sampling_rate_hz` produces in `interval`.
///
/// Always at least one, so every tick yields a non-empty block.
pub fn samples_per_interval(sampling_rate_hz: f64, interval: Duration) -> usize {
    let samples = (sampling_rate_hz * interval.as_secs_f64()).round();
    if samples.is_finite() && samples >= 1.0 {
        samples as usize
    } else {
        1
    }
}
