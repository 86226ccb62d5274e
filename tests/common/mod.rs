// tests/common/mod.rs
//! Shared fixtures for integration tests

#![allow(dead_code)]

use amp_core::capability::{features, CapabilityRegistryBuilder};
use amp_core::channel::{Channel, ChannelId};
use amp_core::error::{AcqResult, TransportError};
use amp_core::hal::{AcquisitionHardware, AcquisitionMode, DeviceInfo, HardwareHandle};
use amp_core::telemetry::{CounterSession, TelemetryError, TelemetrySession};
use amp_core::utils::time::samples_per_interval;
use ndarray::Array2;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters and failure switches shared between a test and its mock
#[derive(Debug, Default)]
pub struct MockProbe {
    pub connects: AtomicU32,
    pub disconnects: AtomicU32,
    pub setups: AtomicU32,
    pub mode_changes: AtomicU32,
    pub blocks: AtomicU32,
    pub impedance_reads: AtomicU32,
    pub firmware_updates: AtomicU32,

    pub fail_connect: AtomicBool,
    pub fail_setup: AtomicBool,
    pub fail_mode_change: AtomicBool,
    pub fail_disconnect: AtomicBool,
    pub wrong_row_count: AtomicBool,
}

impl MockProbe {
    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }
}

/// Minimal amplifier whose behaviour is driven by [`MockProbe`].
///
/// Row `i` of every block is filled with the value `i`, so tests can check
/// row order.
pub struct MockAmplifier {
    pub probe: Arc<MockProbe>,
    pub multi_frequency: bool,
    pub can_update: bool,
    pub firmware_result: bool,
    pub has_been_updated: bool,
    pub ohmeter: bool,
    pub ohmeter_result: bool,
    /// Mode last accepted by the mode hook
    pub hardware_mode: AcquisitionMode,
    pub connected: bool,
    pub session: Arc<dyn TelemetrySession>,
}

impl MockAmplifier {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(MockProbe::default()),
            multi_frequency: false,
            can_update: false,
            firmware_result: true,
            has_been_updated: false,
            ohmeter: true,
            ohmeter_result: true,
            hardware_mode: AcquisitionMode::Idle,
            connected: false,
            session: Arc::new(CounterSession::new()),
        }
    }

    pub fn with_session(mut self, session: Arc<dyn TelemetrySession>) -> Self {
        self.session = session;
        self
    }

    pub fn multi_frequency(mut self) -> Self {
        self.multi_frequency = true;
        self
    }

    pub fn updatable(mut self, can_update: bool) -> Self {
        self.can_update = can_update;
        self
    }

    pub fn without_ohmeter(mut self) -> Self {
        self.ohmeter = false;
        self
    }

    pub fn ohmeter_result(mut self, result: bool) -> Self {
        self.ohmeter_result = result;
        self
    }
}

fn failure(flag: &AtomicBool, message: &str) -> Result<(), TransportError> {
    if flag.load(Ordering::SeqCst) {
        return Err(message.to_string().into());
    }
    Ok(())
}

impl AcquisitionHardware for MockAmplifier {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Mock amplifier".to_string(),
            model: "mock".to_string(),
            ..DeviceInfo::default()
        }
    }

    fn connect_core(&mut self) -> Result<(), TransportError> {
        failure(&self.probe.fail_connect, "connect refused")?;
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        self.connected = true;
        Ok(())
    }

    fn disconnect_core(&mut self) -> Result<(), TransportError> {
        self.probe.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected = false;
        failure(&self.probe.fail_disconnect, "link lost during disconnect")
    }

    fn setup_core(&mut self, _channels: &[Channel]) -> Result<(), TransportError> {
        failure(&self.probe.fail_setup, "setup rejected")?;
        self.probe.setups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn change_acquisition_mode_core(
        &mut self,
        mode: &AcquisitionMode,
    ) -> Result<(), TransportError> {
        failure(&self.probe.fail_mode_change, "mode change rejected")?;
        self.probe.mode_changes.fetch_add(1, Ordering::SeqCst);
        self.hardware_mode = mode.clone();
        Ok(())
    }

    fn acquire_block(
        &mut self,
        channels: &[Channel],
        interval: Duration,
    ) -> Result<Array2<f64>, TransportError> {
        self.probe.blocks.fetch_add(1, Ordering::SeqCst);
        let rows = if self.probe.wrong_row_count.load(Ordering::SeqCst) {
            channels.len() + 1
        } else {
            channels.len()
        };
        let columns = samples_per_interval(channels[0].sampling_rate(), interval);
        Ok(Array2::from_shape_fn((rows, columns), |(row, _)| row as f64))
    }

    fn measure_impedance(&mut self, channels: &[Channel]) -> Result<Vec<f64>, TransportError> {
        self.probe.impedance_reads.fetch_add(1, Ordering::SeqCst);
        Ok((0..channels.len()).map(|i| i as f64 + 1.0).collect())
    }

    fn supports_multi_frequency(&self) -> bool {
        self.multi_frequency
    }

    fn register_capabilities(
        hardware: &HardwareHandle<Self>,
        registry: &mut CapabilityRegistryBuilder,
    ) -> AcqResult<()> {
        let enabled = hardware.clone();
        let perform = hardware.clone();
        registry.register(
            features::FIRMWARE_UPDATE,
            || true,
            move || enabled.lock().can_update,
            move || {
                let mut amp = perform.lock();
                amp.has_been_updated = true;
                amp.probe.firmware_updates.fetch_add(1, Ordering::SeqCst);
                amp.firmware_result
            },
        )?;

        if hardware.lock().ohmeter {
            let enabled = hardware.clone();
            let perform = hardware.clone();
            registry.register(
                features::OHMETER,
                || true,
                move || enabled.lock().connected,
                move || perform.lock().ohmeter_result,
            )?;
        }
        Ok(())
    }

    fn create_session(&self) -> Arc<dyn TelemetrySession> {
        self.session.clone()
    }
}

/// Session whose lifecycle calls can be made to fail
#[derive(Debug, Default)]
pub struct FailingSession {
    pub fail_start: bool,
    pub fail_stop: bool,
    pub stops: AtomicU32,
}

impl TelemetrySession for FailingSession {
    fn start(&self) -> Result<(), TelemetryError> {
        if self.fail_start {
            return Err(TelemetryError::Backend("collector unreachable".into()));
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), TelemetryError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(TelemetryError::Backend("flush failed".into()));
        }
        Ok(())
    }

    fn increment(&self, _key: &str, _amount: u64) -> Result<(), TelemetryError> {
        Ok(())
    }
}

pub fn channel(name: &str, rate: f64) -> Channel {
    Channel::with_default_range(ChannelId::random(), name, rate).expect("valid channel")
}

/// Wait until `condition` holds or `timeout` elapses
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Install a test subscriber once; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
