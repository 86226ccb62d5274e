// src/hal/simulator.rs
//! Simulated amplifier
//!
//! Generates a sinusoid plus uniform noise scaled into each channel's input
//! range, a square wave while calibrating, and impedance readings scattered
//! around a configured base value. Failure injection lets tests drive every
//! error path of the state machine.

use crate::capability::{features, CapabilityRegistryBuilder};
use crate::channel::Channel;
use crate::config::constants::simulation;
use crate::error::{AcqResult, TransportError};
use crate::hal::{AcquisitionHardware, AcquisitionMode, DeviceInfo, HardwareHandle};
use crate::telemetry::{NullSession, TelemetrySession};
use crate::utils::time::samples_per_interval;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Hook at which the simulator reports an injected failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePoint {
    Connect,
    Setup,
    ModeChange,
    Disconnect,
    Acquire,
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub serial_number: String,
    pub firmware_version: u32,
    pub latest_firmware_version: u32,
    /// Fraction of the channel half-span, 0.0..=1.0
    pub signal_amplitude: f64,
    /// Fraction of the channel half-span
    pub noise_level: f64,
    pub signal_frequency_hz: f64,
    pub base_impedance_kohm: f64,
    pub multi_frequency: bool,
    pub fail_on: Option<FailurePoint>,
    /// Fixed RNG seed for reproducible signals
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            serial_number: simulation::DEFAULT_SERIAL_NUMBER.to_string(),
            firmware_version: simulation::DEFAULT_FIRMWARE_VERSION,
            latest_firmware_version: simulation::DEFAULT_LATEST_FIRMWARE_VERSION,
            signal_amplitude: simulation::DEFAULT_SIGNAL_AMPLITUDE,
            noise_level: simulation::DEFAULT_NOISE_LEVEL,
            signal_frequency_hz: simulation::DEFAULT_SIGNAL_FREQUENCY_HZ,
            base_impedance_kohm: simulation::DEFAULT_BASE_IMPEDANCE_KOHM,
            multi_frequency: false,
            fail_on: None,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), SimulatorError> {
        if !(0.0..=1.0).contains(&self.signal_amplitude) {
            return Err(SimulatorError::Configuration(format!(
                "signal_amplitude {} is outside [0, 1]",
                self.signal_amplitude
            )));
        }
        if !self.noise_level.is_finite() || self.noise_level < 0.0 {
            return Err(SimulatorError::Configuration(format!(
                "noise_level {} must be finite and >= 0",
                self.noise_level
            )));
        }
        if !self.signal_frequency_hz.is_finite() || self.signal_frequency_hz <= 0.0 {
            return Err(SimulatorError::Configuration(format!(
                "signal_frequency_hz {} must be finite and > 0",
                self.signal_frequency_hz
            )));
        }
        if !self.base_impedance_kohm.is_finite() || self.base_impedance_kohm < 0.0 {
            return Err(SimulatorError::Configuration(format!(
                "base_impedance_kohm {} must be finite and >= 0",
                self.base_impedance_kohm
            )));
        }
        Ok(())
    }
}

/// Simulator errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulatorError {
    #[error("simulator configuration error: {0}")]
    Configuration(String),

    #[error("simulator is not connected")]
    NotConnected,

    #[error("simulator is already connected")]
    AlreadyConnected,

    #[error("{requested} channels requested, simulator supports {max}")]
    TooManyChannels { requested: usize, max: usize },

    #[error("channel '{name}' requests {rate} Hz, simulator supports up to {max} Hz")]
    RateTooHigh { name: String, rate: f64, max: f64 },

    #[error("injected failure at {0:?}")]
    Injected(FailurePoint),
}

/// Simulated multi-channel amplifier
pub struct SimulatedAmplifier {
    config: SimulatorConfig,
    connected: bool,
    firmware_version: u32,
    firmware_updates: u32,
    calibration_signal: bool,
    mode: AcquisitionMode,
    configured_channels: usize,
    elapsed_seconds: f64,
    rng: StdRng,
    session: Arc<dyn TelemetrySession>,
}

impl SimulatedAmplifier {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            firmware_version: config.firmware_version,
            config,
            connected: false,
            firmware_updates: 0,
            calibration_signal: false,
            mode: AcquisitionMode::Idle,
            configured_channels: 0,
            elapsed_seconds: 0.0,
            rng,
            session: Arc::new(NullSession),
        }
    }

    /// Telemetry session handed to the device on connect
    pub fn with_session(mut self, session: Arc<dyn TelemetrySession>) -> Self {
        self.session = session;
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Change the injected failure point at runtime
    pub fn set_fail_on(&mut self, point: Option<FailurePoint>) {
        self.config.fail_on = point;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn firmware_version(&self) -> u32 {
        self.firmware_version
    }

    /// Number of firmware updates performed
    pub fn firmware_updates(&self) -> u32 {
        self.firmware_updates
    }

    pub fn calibration_signal(&self) -> bool {
        self.calibration_signal
    }

    pub fn mode(&self) -> &AcquisitionMode {
        &self.mode
    }

    pub fn configured_channels(&self) -> usize {
        self.configured_channels
    }

    fn check(&self, point: FailurePoint) -> Result<(), SimulatorError> {
        if self.config.fail_on == Some(point) {
            return Err(SimulatorError::Injected(point));
        }
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), SimulatorError> {
        if !self.connected {
            return Err(SimulatorError::NotConnected);
        }
        Ok(())
    }

    fn update_firmware(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        tracing::info!(
            from = self.firmware_version,
            to = self.config.latest_firmware_version,
            "simulated firmware update"
        );
        self.firmware_version = self.config.latest_firmware_version;
        self.firmware_updates += 1;
        true
    }

    fn sample(&mut self, channel: &Channel, t: f64, square: bool) -> f64 {
        let range = channel.range();
        let half_span = range.span() / 2.0;

        let signal = if square {
            let phase = (t * simulation::CALIBRATION_FREQUENCY_HZ).fract();
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        } else {
            (TAU * self.config.signal_frequency_hz * t).sin()
        };

        let noise = if self.config.noise_level > 0.0 {
            self.rng.gen_range(-1.0..=1.0) * self.config.noise_level
        } else {
            0.0
        };

        range.clamp(range.center() + half_span * (self.config.signal_amplitude * signal + noise))
    }
}

impl Default for SimulatedAmplifier {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl AcquisitionHardware for SimulatedAmplifier {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Simulated amplifier".to_string(),
            model: simulation::DEFAULT_MODEL.to_string(),
            serial_number: self.config.serial_number.clone(),
            firmware_version: self.firmware_version,
            max_channels: simulation::DEFAULT_MAX_CHANNELS,
            max_sampling_rate_hz: simulation::DEFAULT_MAX_SAMPLING_RATE_HZ,
        }
    }

    fn connect_core(&mut self) -> Result<(), TransportError> {
        self.check(FailurePoint::Connect)?;
        if self.connected {
            return Err(SimulatorError::AlreadyConnected.into());
        }
        self.connected = true;
        self.elapsed_seconds = 0.0;
        Ok(())
    }

    fn disconnect_core(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        self.calibration_signal = false;
        self.mode = AcquisitionMode::Idle;
        self.configured_channels = 0;
        // the link is down either way, the failure is only reported
        self.check(FailurePoint::Disconnect)?;
        Ok(())
    }

    fn setup_core(&mut self, channels: &[Channel]) -> Result<(), TransportError> {
        self.ensure_connected()?;
        self.check(FailurePoint::Setup)?;

        if channels.len() > simulation::DEFAULT_MAX_CHANNELS {
            return Err(SimulatorError::TooManyChannels {
                requested: channels.len(),
                max: simulation::DEFAULT_MAX_CHANNELS,
            }
            .into());
        }
        if let Some(channel) = channels
            .iter()
            .find(|channel| channel.sampling_rate() > simulation::DEFAULT_MAX_SAMPLING_RATE_HZ)
        {
            return Err(SimulatorError::RateTooHigh {
                name: channel.name().to_string(),
                rate: channel.sampling_rate(),
                max: simulation::DEFAULT_MAX_SAMPLING_RATE_HZ,
            }
            .into());
        }

        self.configured_channels = channels.len();
        Ok(())
    }

    fn change_acquisition_mode_core(
        &mut self,
        mode: &AcquisitionMode,
    ) -> Result<(), TransportError> {
        self.ensure_connected()?;
        self.check(FailurePoint::ModeChange)?;
        self.mode = mode.clone();
        Ok(())
    }

    fn acquire_block(
        &mut self,
        channels: &[Channel],
        interval: Duration,
    ) -> Result<Array2<f64>, TransportError> {
        self.ensure_connected()?;
        self.check(FailurePoint::Acquire)?;

        let columns = channels
            .iter()
            .map(|channel| samples_per_interval(channel.sampling_rate(), interval))
            .max()
            .unwrap_or(1);
        let step = interval.as_secs_f64() / columns as f64;
        let square = self.calibration_signal || self.mode == AcquisitionMode::Calibration;
        let start = self.elapsed_seconds;

        let mut block = Array2::zeros((channels.len(), columns));
        for (row, channel) in channels.iter().enumerate() {
            for column in 0..columns {
                let t = start + column as f64 * step;
                block[[row, column]] = self.sample(channel, t, square);
            }
        }

        self.elapsed_seconds += interval.as_secs_f64();
        Ok(block)
    }

    fn measure_impedance(&mut self, channels: &[Channel]) -> Result<Vec<f64>, TransportError> {
        self.ensure_connected()?;
        self.check(FailurePoint::Acquire)?;

        let base = self.config.base_impedance_kohm;
        let jitter = simulation::IMPEDANCE_JITTER_KOHM;
        Ok(channels
            .iter()
            .map(|_| (base + self.rng.gen_range(-jitter..=jitter)).max(0.0))
            .collect())
    }

    fn supports_multi_frequency(&self) -> bool {
        self.config.multi_frequency
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
            move || {
                let amp = enabled.lock();
                amp.firmware_version < amp.config.latest_firmware_version
            },
            move || perform.lock().update_firmware(),
        )?;

        let enabled = hardware.clone();
        let perform = hardware.clone();
        registry.register(
            features::OHMETER,
            || true,
            move || enabled.lock().connected,
            move || perform.lock().connected,
        )?;

        let enabled = hardware.clone();
        let perform = hardware.clone();
        registry.register(
            features::CALIBRATION,
            || true,
            move || !enabled.lock().calibration_signal,
            move || {
                let mut amp = perform.lock();
                if !amp.connected {
                    return false;
                }
                amp.calibration_signal = true;
                true
            },
        )?;

        Ok(())
    }

    fn create_session(&self) -> Arc<dyn TelemetrySession> {
        self.session.clone()
    }
}
