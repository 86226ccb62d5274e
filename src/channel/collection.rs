// src/channel/collection.rs
//! Ordered, sealable channel collection

use crate::channel::{Channel, ChannelId};
use crate::error::{AcqError, AcqResult, ValidationError};
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered set of channels, mutable until sealed.
///
/// Insertion order is the row order of emitted sample matrices. Sealing
/// freezes the contents into a shared snapshot that producers read
/// concurrently.
#[derive(Debug, Default)]
pub struct ChannelCollection {
    channels: Vec<Channel>,
    sealed: Option<Arc<[Channel]>>,
}

impl ChannelCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a channel
    pub fn add(&mut self, channel: Channel) -> Result<(), ValidationError> {
        self.ensure_unsealed()?;
        if self.contains(channel.id()) {
            return Err(ValidationError::DuplicateChannel(channel.id()));
        }
        self.channels.push(channel);
        Ok(())
    }

    /// Remove and return the channel with `id`
    pub fn remove(&mut self, id: ChannelId) -> Result<Channel, ValidationError> {
        self.ensure_unsealed()?;
        let index = self
            .position(id)
            .ok_or(ValidationError::ChannelNotFound(id))?;
        Ok(self.channels.remove(index))
    }

    /// Mutate one channel in place.
    ///
    /// The closure works on a copy; the change is committed only if it
    /// succeeds and the resulting id is still unique.
    pub fn update<F>(&mut self, id: ChannelId, f: F) -> Result<(), ValidationError>
    where
        F: FnOnce(&mut Channel) -> Result<(), ValidationError>,
    {
        self.ensure_unsealed()?;
        let index = self
            .position(id)
            .ok_or(ValidationError::ChannelNotFound(id))?;

        let mut candidate = self.channels[index].clone();
        f(&mut candidate)?;

        let new_id = candidate.id();
        if new_id != id && self.contains(new_id) {
            return Err(ValidationError::DuplicateChannel(new_id));
        }
        self.channels[index] = candidate;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), ValidationError> {
        self.ensure_unsealed()?;
        self.channels.clear();
        Ok(())
    }

    /// Freeze the collection. Sealing twice returns the same snapshot.
    pub fn seal(&mut self) -> Arc<[Channel]> {
        self.sealed
            .get_or_insert_with(|| Arc::from(self.channels.as_slice()))
            .clone()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.is_some()
    }

    /// Shared read-only view, available once sealed
    pub fn snapshot(&self) -> Option<Arc<[Channel]>> {
        self.sealed.clone()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Channel> {
        self.channels.iter()
    }

    pub fn as_slice(&self) -> &[Channel] {
        &self.channels
    }

    pub fn get(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.id() == id)
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.get(id).is_some()
    }

    pub fn position(&self, id: ChannelId) -> Option<usize> {
        self.channels.iter().position(|channel| channel.id() == id)
    }

    /// Guard applied before a device accepts setup.
    ///
    /// Requires a sealed, non-empty collection with unique ids and, unless
    /// `multi_frequency` is set, one sampling rate shared by every channel.
    pub fn validate_for_setup(&self, multi_frequency: bool) -> AcqResult<Arc<[Channel]>> {
        let snapshot = self
            .sealed
            .clone()
            .ok_or_else(|| AcqError::state("setup", "channel collection is not sealed"))?;

        if snapshot.is_empty() {
            return Err(AcqError::state("setup", "no channels configured"));
        }

        let mut seen = HashSet::with_capacity(snapshot.len());
        for channel in snapshot.iter() {
            if !seen.insert(channel.id()) {
                return Err(AcqError::state(
                    "setup",
                    format!("duplicate channel id {}", channel.id()),
                ));
            }
        }

        if !multi_frequency {
            let reference = &snapshot[0];
            let mismatched: Vec<String> = snapshot
                .iter()
                .skip(1)
                .filter(|channel| channel.sampling_rate() != reference.sampling_rate())
                .map(|channel| format!("'{}' ({} Hz)", channel.name(), channel.sampling_rate()))
                .collect();

            if !mismatched.is_empty() {
                return Err(AcqError::state(
                    "setup",
                    format!(
                        "device does not support multiple sampling rates: '{}' ({} Hz) disagrees with {}",
                        reference.name(),
                        reference.sampling_rate(),
                        mismatched.join(", ")
                    ),
                ));
            }
        }

        Ok(snapshot)
    }

    fn ensure_unsealed(&self) -> Result<(), ValidationError> {
        if self.is_sealed() {
            return Err(ValidationError::CollectionSealed);
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ChannelCollection {
    type Item = &'a Channel;
    type IntoIter = std::slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
