// src/device/events.rs
//! Packets emitted by a running device and their fan-out

use crate::hal::AcquisitionMode;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use ndarray::Array2;
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One block of samples
#[derive(Debug, Clone, PartialEq)]
pub struct DataPacket {
    pub device_id: String,
    /// Per-producer counter starting at 0
    pub sequence: u64,
    /// Time since the device connected
    pub timestamp: Duration,
    pub mode: AcquisitionMode,
    /// One row per channel, in channel order
    pub samples: Array2<f64>,
}

impl DataPacket {
    pub fn channel_count(&self) -> usize {
        self.samples.nrows()
    }

    pub fn samples_per_channel(&self) -> usize {
        self.samples.ncols()
    }
}

/// One impedance reading per channel, in kΩ
#[derive(Debug, Clone, PartialEq)]
pub struct ImpedancePacket {
    pub device_id: String,
    pub sequence: u64,
    pub timestamp: Duration,
    pub values: Vec<f64>,
}

/// Event delivered to listeners and subscribers
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Data(Arc<DataPacket>),
    Impedance(Arc<ImpedancePacket>),
}

impl DeviceEvent {
    pub fn timestamp(&self) -> Duration {
        match self {
            DeviceEvent::Data(packet) => packet.timestamp,
            DeviceEvent::Impedance(packet) => packet.timestamp,
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            DeviceEvent::Data(packet) => &packet.device_id,
            DeviceEvent::Impedance(packet) => &packet.device_id,
        }
    }

    pub fn as_data(&self) -> Option<&DataPacket> {
        match self {
            DeviceEvent::Data(packet) => Some(packet),
            DeviceEvent::Impedance(_) => None,
        }
    }

    pub fn as_impedance(&self) -> Option<&ImpedancePacket> {
        match self {
            DeviceEvent::Impedance(packet) => Some(packet),
            DeviceEvent::Data(_) => None,
        }
    }
}

/// Handle returned by [`EventDispatcher::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

/// Fans events out to callback listeners and channel subscribers.
///
/// Listeners run on the producer thread. The listener list is copied before
/// dispatch, so a listener may add or remove listeners while being called.
pub struct EventDispatcher {
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    subscribers: Mutex<Vec<Sender<DeviceEvent>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl EventDispatcher {
    /// `buffer` bounds each subscriber queue
    pub fn new(buffer: usize) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            buffer: buffer.max(1),
        }
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Returns whether a listener was removed
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Bounded subscription. Events are dropped for a subscriber whose queue
    /// is full.
    pub fn subscribe(&self) -> Receiver<DeviceEvent> {
        let (tx, rx) = channel::bounded(self.buffer);
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscribe_unbounded(&self) -> Receiver<DeviceEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn emit(&self, event: DeviceEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(&event)));
            if outcome.is_err() {
                tracing::warn!(device_id = event.device_id(), "event listener panicked");
            }
        }

        self.subscribers
            .lock()
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        device_id = event.device_id(),
                        "subscriber queue full, event dropped"
                    );
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(crate::config::constants::device::DEFAULT_EVENT_BUFFER)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_count())
            .field("subscribers", &self.subscriber_count())
            .field("buffer", &self.buffer)
            .finish()
    }
}
