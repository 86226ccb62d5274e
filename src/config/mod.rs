// src/config/mod.rs
//! Device and channel configuration

pub mod constants;
pub mod loader;

pub use loader::{ConfigError, ConfigLoader};

use crate::channel::{Channel, ChannelId, InputRange};
use crate::device::AcquisitionDevice;
use crate::error::AcqResult;
use crate::hal::AcquisitionHardware;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "simulation")]
use crate::hal::simulator::{SimulatedAmplifier, SimulatorConfig};

/// Complete acquisition configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub device: DeviceSettings,
    pub channels: Vec<ChannelSettings>,
}

/// Device-level settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DeviceSettings {
    /// Identifier used in events and logs; random when absent
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default = "defaults::data_tick_interval_ms")]
    pub data_tick_interval_ms: u64,

    #[serde(default = "defaults::ohmeter_tick_interval_ms")]
    pub ohmeter_tick_interval_ms: u64,

    #[serde(default = "defaults::event_buffer")]
    pub event_buffer: usize,

    #[cfg(feature = "simulation")]
    #[serde(default)]
    pub simulator: Option<SimulatorConfig>,
}

/// One configured channel
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChannelSettings {
    /// Random when absent
    #[serde(default)]
    pub id: Option<ChannelId>,

    pub name: String,

    #[serde(default = "defaults::sampling_rate_hz")]
    pub sampling_rate_hz: f64,

    #[serde(default)]
    pub range: Option<InputRange>,
}

mod defaults {
    use crate::config::constants::*;

    pub fn data_tick_interval_ms() -> u64 { device::DEFAULT_DATA_TICK_MS }
    pub fn ohmeter_tick_interval_ms() -> u64 { device::DEFAULT_OHMETER_TICK_MS }
    pub fn event_buffer() -> usize { device::DEFAULT_EVENT_BUFFER }
    pub fn sampling_rate_hz() -> f64 { channel::DEFAULT_SAMPLING_RATE_HZ }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            id: None,
            data_tick_interval_ms: defaults::data_tick_interval_ms(),
            ohmeter_tick_interval_ms: defaults::ohmeter_tick_interval_ms(),
            event_buffer: defaults::event_buffer(),
            #[cfg(feature = "simulation")]
            simulator: None,
        }
    }
}

impl DeviceSettings {
    pub fn data_tick_interval(&self) -> Duration {
        Duration::from_millis(self.data_tick_interval_ms)
    }

    pub fn ohmeter_tick_interval(&self) -> Duration {
        Duration::from_millis(self.ohmeter_tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        use constants::device::{MAX_TICK_MS, MIN_TICK_MS};

        for (field, value) in [
            ("data_tick_interval_ms", self.data_tick_interval_ms),
            ("ohmeter_tick_interval_ms", self.ohmeter_tick_interval_ms),
        ] {
            if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "device.{} = {} is outside [{}, {}]",
                    field, value, MIN_TICK_MS, MAX_TICK_MS
                )));
            }
        }

        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid(
                "device.event_buffer must be at least 1".to_string(),
            ));
        }

        if matches!(&self.id, Some(id) if id.trim().is_empty()) {
            return Err(ConfigError::Invalid("device.id must not be blank".to_string()));
        }

        #[cfg(feature = "simulation")]
        if let Some(simulator) = &self.simulator {
            simulator.validate().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        }

        Ok(())
    }
}

impl ChannelSettings {
    pub fn new(name: impl Into<String>, sampling_rate_hz: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            sampling_rate_hz,
            range: None,
        }
    }

    /// Build a validated channel
    pub fn build(&self) -> AcqResult<Channel> {
        let id = self.id.unwrap_or_else(ChannelId::random);
        let channel = Channel::new(
            id,
            self.name.clone(),
            self.sampling_rate_hz,
            self.range.unwrap_or_default(),
        )?;
        Ok(channel)
    }
}

impl AcquisitionConfig {
    /// Check device settings and every channel
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.device.validate()?;
        for (index, channel) in self.channels.iter().enumerate() {
            channel
                .build()
                .map_err(|err| ConfigError::Invalid(format!("channels[{}]: {}", index, err)))?;
        }
        Ok(())
    }

    pub fn build_channels(&self) -> AcqResult<Vec<Channel>> {
        self.channels.iter().map(ChannelSettings::build).collect()
    }

    /// Add the configured channels to a device, in file order
    pub fn populate<H: AcquisitionHardware>(&self, device: &AcquisitionDevice<H>) -> AcqResult<()> {
        for channel in self.build_channels()? {
            device.add_channel(channel)?;
        }
        Ok(())
    }

    /// Simulated device built from this configuration, channels added but
    /// not sealed
    #[cfg(feature = "simulation")]
    pub fn simulated_device(&self) -> AcqResult<AcquisitionDevice<SimulatedAmplifier>> {
        self.validate()?;
        let simulator = self.device.simulator.clone().unwrap_or_default();
        let device = AcquisitionDevice::builder(SimulatedAmplifier::new(simulator))
            .settings(&self.device)
            .build();
        self.populate(&device)?;
        Ok(device)
    }
}
