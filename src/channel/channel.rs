// src/channel/channel.rs
//! Description of a single acquisition channel

use crate::config::constants::channel::DEFAULT_INPUT_RANGE_MV;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, caller-supplied channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(Uuid);

impl ChannelId {
    /// Fresh random identifier
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero identifier. Legal, but only once per collection.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ChannelId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input range of a channel as an ordered `(min, max)` pair.
///
/// Units are owned by the physical domain of the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct InputRange {
    min: f64,
    max: f64,
}

impl InputRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ValidationError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(ValidationError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

impl Default for InputRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_INPUT_RANGE_MV.0,
            max: DEFAULT_INPUT_RANGE_MV.1,
        }
    }
}

impl TryFrom<(f64, f64)> for InputRange {
    type Error = ValidationError;

    fn try_from((min, max): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(min, max)
    }
}

impl From<InputRange> for (f64, f64) {
    fn from(range: InputRange) -> Self {
        (range.min, range.max)
    }
}

/// One physical acquisition input.
///
/// Every setter validates eagerly, so a `Channel` value always satisfies its
/// invariants. Once the owning collection is sealed the channel is only
/// reachable through shared references.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    id: ChannelId,
    name: String,
    sampling_rate: f64,
    range: InputRange,
}

impl Channel {
    pub fn new(
        id: ChannelId,
        name: impl Into<String>,
        sampling_rate: f64,
        range: InputRange,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name(&name)?;
        validate_sampling_rate(sampling_rate)?;
        Ok(Self {
            id,
            name,
            sampling_rate,
            range,
        })
    }

    /// Channel with the default input range
    pub fn with_default_range(
        id: ChannelId,
        name: impl Into<String>,
        sampling_rate: f64,
    ) -> Result<Self, ValidationError> {
        Self::new(id, name, sampling_rate, InputRange::default())
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sampling rate in Hz
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn range(&self) -> InputRange {
        self.range
    }

    pub fn set_id(&mut self, id: ChannelId) {
        self.id = id;
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ValidationError> {
        let name = name.into();
        validate_name(&name)?;
        self.name = name;
        Ok(())
    }

    pub fn set_sampling_rate(&mut self, sampling_rate: f64) -> Result<(), ValidationError> {
        validate_sampling_rate(sampling_rate)?;
        self.sampling_rate = sampling_rate;
        Ok(())
    }

    pub fn set_range(&mut self, range: InputRange) {
        self.range = range;
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

fn validate_sampling_rate(sampling_rate: f64) -> Result<(), ValidationError> {
    if !sampling_rate.is_finite() || sampling_rate < 0.0 {
        return Err(ValidationError::InvalidSamplingRate(sampling_rate));
    }
    Ok(())
}
