// src/channel/mod.rs
//! Channel configuration model

pub mod channel;
pub mod collection;

pub use channel::*;
pub use collection::*;
