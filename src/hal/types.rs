// src/hal/types.rs
//! Core types shared between the state machine and hardware implementations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Acquisition mode of a set-up device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    #[default]
    Idle,
    Data,
    Calibration,
    Ohmeter,
    /// Device-defined mode; the core starts no producer for it
    Custom(String),
}

impl AcquisitionMode {
    /// Modes served by the data producer
    pub fn streams_data(&self) -> bool {
        matches!(self, AcquisitionMode::Data | AcquisitionMode::Calibration)
    }

    /// Modes served by the impedance producer
    pub fn measures_impedance(&self) -> bool {
        matches!(self, AcquisitionMode::Ohmeter)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, AcquisitionMode::Idle)
    }
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionMode::Idle => write!(f, "idle"),
            AcquisitionMode::Data => write!(f, "data"),
            AcquisitionMode::Calibration => write!(f, "calibration"),
            AcquisitionMode::Ohmeter => write!(f, "ohmeter"),
            AcquisitionMode::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// Device information reported by the hardware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: u32,
    pub max_channels: usize,
    pub max_sampling_rate_hz: f64,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            model: "unknown".to_string(),
            serial_number: String::new(),
            firmware_version: 0,
            max_channels: 0,
            max_sampling_rate_hz: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_producers() {
        assert!(AcquisitionMode::Data.streams_data());
        assert!(AcquisitionMode::Calibration.streams_data());
        assert!(!AcquisitionMode::Ohmeter.streams_data());
        assert!(AcquisitionMode::Ohmeter.measures_impedance());

        let custom = AcquisitionMode::Custom("Trigger".into());
        assert!(!custom.streams_data());
        assert!(!custom.measures_impedance());
        assert_eq!(custom.to_string(), "custom:Trigger");
        assert!(AcquisitionMode::default().is_idle());
    }

    #[test]
    fn test_mode_deserialization() {
        let mode: AcquisitionMode = serde_json::from_str("\"ohmeter\"").unwrap();
        assert_eq!(mode, AcquisitionMode::Ohmeter);

        let custom: AcquisitionMode = serde_json::from_str(r#"{"custom":"Test"}"#).unwrap();
        assert_eq!(custom, AcquisitionMode::Custom("Test".into()));
    }
}
