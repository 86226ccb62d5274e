// src/utils/mod.rs
//! Shared utilities

pub mod time;

pub use time::{
    samples_per_interval, MockTimeProvider, MonotonicTimeProvider, TimeProvider, TimestampClamp,
};
