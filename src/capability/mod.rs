// src/capability/mod.rs
//! Optional device capabilities
//!
//! Devices expose optional operations (firmware update, impedance check,
//! calibration) by registering a triple of closures under a feature name.
//! The state machine only ever consults the registry, never the concrete
//! device type.

pub mod registry;

pub use registry::*;

/// Feature names the acquisition core acts on
pub mod features {
    /// Invoked during setup when available and enabled
    pub const FIRMWARE_UPDATE: &str = "FirmwareUpdate";
    /// Required to enter ohmeter mode
    pub const OHMETER: &str = "Ohmeter";
    pub const CALIBRATION: &str = "Calibration";
}
