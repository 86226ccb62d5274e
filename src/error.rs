// src/error.rs
//! Unified error handling for amp-core
//!
//! Every fallible operation in the crate returns [`AcqResult`]. The variants of
//! [`AcqError`] follow the order in which problems are detected:
//!
//! - **Validation**: malformed channel attributes or collection misuse, caught
//!   before any transport interaction
//! - **HardwareState**: an operation invoked in a state that forbids it
//! - **UnsupportedFeature** / **CapabilityFailed**: optional capability dispatch
//! - **Transport**: errors raised by the device-specific hooks, carried unchanged
//! - **Teardown**: several teardown steps failed during disconnect or disposal

use crate::channel::ChannelId;
use crate::telemetry::TelemetryError;
use thiserror::Error;

/// Error type produced by transport-specific hooks.
///
/// The core never inspects it; it is wrapped in [`AcqError::Transport`] and
/// handed back to the caller of the triggering operation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for acquisition operations
pub type AcqResult<T> = Result<T, AcqError>;

/// Unified error type for the acquisition core
#[derive(Debug, Error)]
pub enum AcqError {
    /// Channel or collection configuration error
    #[error("[VALIDATION] {0}")]
    Validation(#[from] ValidationError),

    /// Operation attempted in a state that forbids it
    #[error("[STATE] cannot {operation}: {reason}")]
    HardwareState {
        operation: &'static str,
        reason: String,
    },

    /// Capability not registered, not available or not enabled
    #[error("[FEATURE] feature '{0}' is not supported or not currently enabled")]
    UnsupportedFeature(String),

    /// Capability action reported failure where success was required
    #[error("[FEATURE] feature '{0}' reported failure")]
    CapabilityFailed(String),

    /// Capability registry or configuration file problem
    #[error("[CONFIG] {0}")]
    Configuration(String),

    /// Error raised by a transport hook, surfaced unchanged
    #[error("[TRANSPORT] {operation} failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    /// Telemetry session could not be started
    #[error("[TELEMETRY] {0}")]
    Telemetry(#[from] TelemetryError),

    /// Periodic producer thread could not be spawned or terminated abnormally
    #[error("[PRODUCER] {name}: {reason}")]
    Producer { name: String, reason: String },

    /// More than one teardown step failed
    #[error("[TEARDOWN] {} teardown steps failed: {}", .0.len(), summarize(.0))]
    Teardown(Vec<AcqError>),
}

/// Channel and collection validation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("channel name must contain at least one non-whitespace character")]
    EmptyName,

    #[error("sampling rate {0} Hz is invalid, expected a finite value >= 0")]
    InvalidSamplingRate(f64),

    #[error("input range [{min}, {max}] is invalid, expected finite bounds with min <= max")]
    InvalidRange { min: f64, max: f64 },

    #[error("channel {0} is already present in the collection")]
    DuplicateChannel(ChannelId),

    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),

    #[error("channel collection is sealed and can no longer be modified")]
    CollectionSealed,
}

impl AcqError {
    /// Build a hardware-state error
    pub fn state(operation: &'static str, reason: impl Into<String>) -> Self {
        AcqError::HardwareState {
            operation,
            reason: reason.into(),
        }
    }

    /// Collapse the errors collected during teardown.
    ///
    /// No error yields `Ok`, a single error is returned unchanged and several
    /// are aggregated into [`AcqError::Teardown`].
    pub fn from_teardown(mut errors: Vec<AcqError>) -> AcqResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(AcqError::Teardown(errors)),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AcqError::Validation(_))
    }

    pub fn is_hardware_state(&self) -> bool {
        matches!(self, AcqError::HardwareState { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AcqError::Transport { .. })
    }
}

fn summarize(errors: &[AcqError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience trait for wrapping hook results as transport errors
pub trait TransportResultExt<T> {
    fn transport_err(self, operation: &'static str) -> AcqResult<T>;
}

impl<T, E> TransportResultExt<T> for Result<T, E>
where
    E: Into<TransportError>,
{
    fn transport_err(self, operation: &'static str) -> AcqResult<T> {
        self.map_err(|err| AcqError::Transport {
            operation,
            source: err.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_error_display() {
        let err = AcqError::state("setup", "device is not connected");
        assert!(err.is_hardware_state());
        assert_eq!(
            err.to_string(),
            "[STATE] cannot setup: device is not connected"
        );
    }

    #[test]
    fn test_validation_conversion() {
        let err: AcqError = ValidationError::EmptyName.into();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("[VALIDATION]"));
    }

    #[test]
    fn test_transport_result_ext_keeps_source() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "link timed out",
        ));

        let err = result.transport_err("connect").unwrap_err();
        assert!(err.is_transport());
        let source = std::error::Error::source(&err).expect("source preserved");
        assert_eq!(source.to_string(), "link timed out");
    }

    #[test]
    fn test_transport_from_string() {
        let result: Result<(), &str> = Err("cable unplugged");
        let err = result.transport_err("disconnect").unwrap_err();
        assert_eq!(
            err.to_string(),
            "[TRANSPORT] disconnect failed: cable unplugged"
        );
    }

    #[test]
    fn test_from_teardown() {
        assert!(AcqError::from_teardown(Vec::new()).is_ok());

        let single = AcqError::from_teardown(vec![AcqError::state("disconnect", "x")]);
        assert!(single.unwrap_err().is_hardware_state());

        let many = AcqError::from_teardown(vec![
            AcqError::state("disconnect", "first"),
            AcqError::Configuration("second".into()),
        ])
        .unwrap_err();
        match &many {
            AcqError::Teardown(errors) => assert_eq!(errors.len(), 2),
            other => panic!("Expected teardown error, got {:?}", other),
        }
        assert!(many.to_string().contains("first"));
        assert!(many.to_string().contains("second"));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AcqError>();
    }
}
