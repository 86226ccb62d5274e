// src/config/constants.rs
//! Crate-wide configuration constants

/// Device state machine defaults
pub mod device {
    pub const DEFAULT_DATA_TICK_MS: u64 = 100;
    pub const DEFAULT_OHMETER_TICK_MS: u64 = 500;
    pub const MIN_TICK_MS: u64 = 1;
    pub const MAX_TICK_MS: u64 = 60_000;

    /// Queue capacity of each bounded event subscriber
    pub const DEFAULT_EVENT_BUFFER: usize = 256;
}

/// Channel defaults
pub mod channel {
    pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 250.0;
    pub const DEFAULT_INPUT_RANGE_MV: (f64, f64) = (-2500.0, 2500.0);
}

/// Simulated amplifier defaults
pub mod simulation {
    pub const DEFAULT_SERIAL_NUMBER: &str = "SIM-0001";
    pub const DEFAULT_MODEL: &str = "amp-sim";
    pub const DEFAULT_FIRMWARE_VERSION: u32 = 1;
    pub const DEFAULT_LATEST_FIRMWARE_VERSION: u32 = 1;
    pub const DEFAULT_MAX_CHANNELS: usize = 64;
    pub const DEFAULT_MAX_SAMPLING_RATE_HZ: f64 = 16_000.0;

    /// Fraction of the channel half-span used by the synthetic signal
    pub const DEFAULT_SIGNAL_AMPLITUDE: f64 = 0.5;
    pub const DEFAULT_NOISE_LEVEL: f64 = 0.05;
    pub const DEFAULT_SIGNAL_FREQUENCY_HZ: f64 = 10.0;
    pub const CALIBRATION_FREQUENCY_HZ: f64 = 1.0;

    pub const DEFAULT_BASE_IMPEDANCE_KOHM: f64 = 5.0;
    pub const IMPEDANCE_JITTER_KOHM: f64 = 0.5;
}

/// Configuration file locations
pub mod paths {
    pub const DEFAULT_CONFIG_FILE: &str = "amp.toml";
    pub const LOCAL_CONFIG_FILE: &str = "amp.local.toml";

    /// Environment overrides look like `AMP_DEVICE__DATA_TICK_INTERVAL_MS`
    pub const ENV_PREFIX: &str = "AMP";
    pub const ENV_SEPARATOR: &str = "__";
}
