// src/hal/traits.rs
//! Core HAL trait implemented by transport-specific amplifiers

use crate::capability::CapabilityRegistryBuilder;
use crate::channel::Channel;
use crate::error::{AcqResult, TransportError};
use crate::hal::types::{AcquisitionMode, DeviceInfo};
use crate::telemetry::{NullSession, TelemetrySession};
use ndarray::Array2;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to the hardware.
///
/// Capability closures capture clones of it, so they can reach the device
/// without borrowing the state machine.
pub type HardwareHandle<H> = Arc<Mutex<H>>;

/// Transport hooks driven by [`crate::device::AcquisitionDevice`].
///
/// The state machine guarantees ordering: `connect_core` before anything
/// else, `setup_core` only while connected, `change_acquisition_mode_core`
/// only after setup. Hooks never see the device state lock held.
pub trait AcquisitionHardware: Send + 'static {
    /// Static device description
    fn info(&self) -> DeviceInfo;

    fn connect_core(&mut self) -> Result<(), TransportError>;

    fn disconnect_core(&mut self) -> Result<(), TransportError>;

    /// Push the validated channel configuration to the device
    fn setup_core(&mut self, channels: &[Channel]) -> Result<(), TransportError>;

    fn change_acquisition_mode_core(&mut self, mode: &AcquisitionMode)
        -> Result<(), TransportError>;

    /// Read one block of samples covering `interval`.
    ///
    /// Rows follow channel order. The column count is up to the device.
    fn acquire_block(
        &mut self,
        channels: &[Channel],
        interval: Duration,
    ) -> Result<Array2<f64>, TransportError>;

    /// One impedance value per channel, in kΩ
    fn measure_impedance(&mut self, _channels: &[Channel]) -> Result<Vec<f64>, TransportError> {
        Err("impedance measurement not supported".into())
    }

    /// Whether channels may use different sampling rates
    fn supports_multi_frequency(&self) -> bool {
        false
    }

    /// Register device-specific capabilities. Called on every connect.
    fn register_capabilities(
        _hardware: &HardwareHandle<Self>,
        _registry: &mut CapabilityRegistryBuilder,
    ) -> AcqResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }

    /// Telemetry session for one connection
    fn create_session(&self) -> Arc<dyn TelemetrySession> {
        Arc::new(NullSession)
    }
}
