//! amp-core: acquisition device state machine for biosignal amplifiers
//!
//! This library drives multi-channel analog front-ends through a disciplined
//! connect → setup → acquire lifecycle. It features:
//!
//! - A hardware trait with transport hooks implemented per device
//! - A sealable channel model enforcing identity and sampling invariants
//! - Optional capabilities (firmware update, ohmeter, calibration) bound by
//!   explicit registration
//! - Timer-driven producers emitting data and impedance packets
//! - Layered configuration from TOML files and the environment
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use amp_core::channel::{Channel, ChannelId};
//! use amp_core::device::AcquisitionDevice;
//! use amp_core::hal::{AcquisitionMode, SimulatedAmplifier};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = AcquisitionDevice::new(SimulatedAmplifier::default());
//!     device.add_channel(Channel::with_default_range(ChannelId::random(), "Fp1", 250.0)?)?;
//!     device.add_channel(Channel::with_default_range(ChannelId::random(), "Fp2", 250.0)?)?;
//!     device.seal_channels();
//!
//!     let events = device.subscribe();
//!     device.connect()?;
//!     device.setup()?;
//!     device.change_acquisition_mode(AcquisitionMode::Data)?;
//!
//!     for event in events.iter().take(10) {
//!         if let Some(packet) = event.as_data() {
//!             println!("{} x {} samples", packet.channel_count(), packet.samples_per_channel());
//!         }
//!     }
//!
//!     device.disconnect()?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod capability;
pub mod channel;
pub mod config;
pub mod device;
pub mod error;
pub mod hal;
pub mod telemetry;
pub mod utils;

// Re-export commonly used types for convenience
pub use capability::{CapabilityProvider, CapabilityRegistry, CapabilityRegistryBuilder};
pub use channel::{Channel, ChannelCollection, ChannelId, InputRange};
pub use config::{AcquisitionConfig, ConfigLoader};
pub use device::{AcquisitionDevice, DataPacket, DeviceBuilder, DeviceEvent, ImpedancePacket};
pub use error::{AcqError, AcqResult, TransportError, ValidationError};
pub use hal::{AcquisitionHardware, AcquisitionMode, DeviceInfo};
pub use telemetry::{TelemetryError, TelemetrySession};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Acquisition device state machine for biosignal amplifiers".to_string(),
        features: vec![
            "Hardware abstraction layer".to_string(),
            "Capability registry".to_string(),
            "Periodic data and impedance producers".to_string(),
            "Layered configuration management".to_string(),
            #[cfg(feature = "simulation")]
            "Simulated amplifier".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert!(!info.features.is_empty());
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "amp-core");
    }
}
