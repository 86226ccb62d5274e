// src/hal/mod.rs
//! Hardware abstraction layer for acquisition devices

pub mod traits;
pub mod types;

#[cfg(feature = "simulation")]
pub mod simulator;

pub use traits::*;
pub use types::*;

#[cfg(feature = "simulation")]
pub use simulator::{FailurePoint, SimulatedAmplifier, SimulatorConfig, SimulatorError};
