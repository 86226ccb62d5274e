// src/telemetry/mod.rs
//! Telemetry session hooks consumed by the acquisition device
//!
//! A device owns exactly one session per connection. The session is started
//! after the transport connects and stopped during teardown. Counter updates
//! are fire-and-forget: failures are logged and never reach the acquisition
//! path.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use thiserror::Error;

/// Counter keys emitted by the acquisition core
pub mod keys {
    pub const CONNECT: &str = "device.connect";
    pub const SETUP: &str = "device.setup";
    pub const MODE_CHANGE: &str = "device.mode_change";
    pub const DISCONNECT: &str = "device.disconnect";
    pub const DATA_PACKETS: &str = "packets.data";
    pub const IMPEDANCE_PACKETS: &str = "packets.impedance";
    pub const PRODUCER_ERRORS: &str = "producer.errors";

    /// Key counting invocations of a named capability
    pub fn capability(name: &str) -> String {
        format!("capability.{}", name)
    }
}

/// Telemetry session failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    #[error("telemetry session is not running")]
    NotRunning,

    #[error("telemetry backend failed: {0}")]
    Backend(String),
}

/// Session contract consumed by the device.
///
/// Implementations are shared between the state machine and the periodic
/// producers, so `increment` may be called concurrently.
pub trait TelemetrySession: Send + Sync {
    /// Called once after a successful transport connect
    fn start(&self) -> Result<(), TelemetryError>;

    /// Called once during teardown
    fn stop(&self) -> Result<(), TelemetryError>;

    /// Add `amount` to the counter named `key`
    fn increment(&self, key: &str, amount: u64) -> Result<(), TelemetryError>;
}

/// Inert session used when a device does not provide its own
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSession;

impl TelemetrySession for NullSession {
    fn start(&self) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn stop(&self) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn increment(&self, _key: &str, _amount: u64) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// In-memory counter session
///
/// Counting is rejected while the session is not running, which makes
/// misordered lifecycle calls visible in tests.
#[derive(Debug, Default)]
pub struct CounterSession {
    running: AtomicBool,
    starts: AtomicU32,
    stops: AtomicU32,
    counters: Mutex<HashMap<String, u64>>,
}

impl CounterSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, zero when never incremented
    pub fn counter(&self, key: &str) -> u64 {
        self.counters.lock().get(key).copied().unwrap_or(0)
    }

    /// Copy of every counter
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counters.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn start_count(&self) -> u32 {
        self.starts.load(Ordering::Relaxed)
    }

    pub fn stop_count(&self) -> u32 {
        self.stops.load(Ordering::Relaxed)
    }
}

impl TelemetrySession for CounterSession {
    fn start(&self) -> Result<(), TelemetryError> {
        self.starts.fetch_add(1, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&self) -> Result<(), TelemetryError> {
        self.stops.fetch_add(1, Ordering::Relaxed);
        if !self.running.swap(false, Ordering::AcqRel) {
            return Err(TelemetryError::NotRunning);
        }
        Ok(())
    }

    fn increment(&self, key: &str, amount: u64) -> Result<(), TelemetryError> {
        if !self.is_running() {
            return Err(TelemetryError::NotRunning);
        }
        let mut counters = self.counters.lock();
        let value = counters.entry(key.to_string()).or_insert(0);
        *value = value.saturating_add(amount);
        Ok(())
    }
}

/// Increment a counter, logging instead of propagating failures
pub fn record_counter(session: &dyn TelemetrySession, key: &str, amount: u64) {
    if let Err(err) = session.increment(key, amount) {
        tracing::warn!(counter = key, error = %err, "telemetry counter update dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_null_session_accepts_everything() {
        let session = NullSession;
        assert!(session.start().is_ok());
        assert!(session.increment("anything", 3).is_ok());
        assert!(session.stop().is_ok());
    }

    #[test]
    fn test_counter_session_lifecycle() {
        let session = CounterSession::new();
        assert_eq!(
            session.increment(keys::CONNECT, 1),
            Err(TelemetryError::NotRunning)
        );

        session.start().unwrap();
        session.increment(keys::CONNECT, 1).unwrap();
        session.increment(keys::CONNECT, 2).unwrap();
        assert_eq!(session.counter(keys::CONNECT), 3);
        assert_eq!(session.counter(keys::SETUP), 0);

        session.stop().unwrap();
        assert!(!session.is_running());
        assert_eq!(session.stop(), Err(TelemetryError::NotRunning));
        assert_eq!(session.start_count(), 1);
        assert_eq!(session.stop_count(), 2);
    }

    #[test]
    fn test_record_counter_swallows_errors() {
        let session = CounterSession::new();
        record_counter(&session, keys::DATA_PACKETS, 1);
        assert_eq!(session.counter(keys::DATA_PACKETS), 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let session = Arc::new(CounterSession::new());
        session.start().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = session.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        record_counter(&*session, keys::DATA_PACKETS, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(session.counter(keys::DATA_PACKETS), 1000);
    }

    #[test]
    fn test_capability_key() {
        assert_eq!(keys::capability("Ohmeter"), "capability.Ohmeter");
    }
}
