// src/device/state.rs
//! Observable device state

use crate::hal::AcquisitionMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SetupState {
    #[default]
    NotSetup,
    Setup,
}

/// Point-in-time view of a device
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub connection: ConnectionState,
    pub setup: SetupState,
    pub mode: AcquisitionMode,
    pub disposed: bool,
}

impl DeviceStatus {
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn is_setup(&self) -> bool {
        self.setup == SetupState::Setup
    }

    /// Back to the state of a freshly constructed device
    pub(crate) fn reset(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.setup = SetupState::NotSetup;
        self.mode = AcquisitionMode::Idle;
    }
}
