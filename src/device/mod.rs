// src/device/mod.rs
//! Acquisition device state machine
//!
//! [`AcquisitionDevice`] drives an [`AcquisitionHardware`] implementation
//! through connect → setup → acquisition modes → disconnect and owns
//! everything bound to a connection: the capability registry, the telemetry
//! session and the periodic producers.
//!
//! Transitions take `&self` and are serialised by one lock. The observable
//! status, the channel collection and the registry sit behind separate
//! short-lived locks, so listeners running on producer threads can inspect
//! the device while a transition is waiting for that producer to stop.

pub mod events;
pub mod producer;
pub mod state;

pub use events::*;
pub use producer::PeriodicProducer;
pub use state::*;

use crate::capability::{features, CapabilityProvider, CapabilityRegistry};
use crate::channel::{Channel, ChannelCollection, ChannelId};
use crate::config::constants::device as defaults;
use crate::config::DeviceSettings;
use crate::error::{AcqError, AcqResult, TransportResultExt, ValidationError};
use crate::hal::{AcquisitionHardware, AcquisitionMode, DeviceInfo, HardwareHandle};
use crate::telemetry::{keys, record_counter, TelemetrySession};
use crate::utils::time::{MonotonicTimeProvider, TimeProvider, TimestampClamp};
use crossbeam::channel::Receiver;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Teardown steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeardownStep {
    StopProducers,
    TransportDisconnect,
    ReleaseSession,
    DiscardRegistry,
}

impl TeardownStep {
    const ORDER: [TeardownStep; 4] = [
        TeardownStep::StopProducers,
        TeardownStep::TransportDisconnect,
        TeardownStep::ReleaseSession,
        TeardownStep::DiscardRegistry,
    ];
}

/// Bound a producer interval to the accepted tick range
pub fn clamp_tick_interval(interval: Duration) -> Duration {
    let min = Duration::from_millis(defaults::MIN_TICK_MS);
    let max = Duration::from_millis(defaults::MAX_TICK_MS);
    let clamped = interval.clamp(min, max);
    if clamped != interval {
        tracing::warn!(
            requested_ms = interval.as_secs_f64() * 1e3,
            clamped_ms = clamped.as_millis() as u64,
            "tick interval out of range, clamped"
        );
    }
    clamped
}

/// State owned by the transition lock
#[derive(Default)]
struct Lifecycle {
    disposed: bool,
    producer: Option<PeriodicProducer>,
    /// Snapshot pushed to the hardware by the last successful setup
    configured: Option<Arc<[Channel]>>,
    epoch_nanos: u64,
}

/// Builder for [`AcquisitionDevice`]
pub struct DeviceBuilder<H: AcquisitionHardware> {
    hardware: H,
    id: Option<String>,
    data_interval: Duration,
    ohmeter_interval: Duration,
    event_buffer: usize,
    providers: Vec<Arc<dyn CapabilityProvider>>,
    clock: Arc<dyn TimeProvider>,
}

impl<H: AcquisitionHardware> DeviceBuilder<H> {
    pub fn new(hardware: H) -> Self {
        Self {
            hardware,
            id: None,
            data_interval: Duration::from_millis(defaults::DEFAULT_DATA_TICK_MS),
            ohmeter_interval: Duration::from_millis(defaults::DEFAULT_OHMETER_TICK_MS),
            event_buffer: defaults::DEFAULT_EVENT_BUFFER,
            providers: Vec::new(),
            clock: Arc::new(MonotonicTimeProvider::new()),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Data producer period, clamped to `MIN_TICK_MS..=MAX_TICK_MS`
    pub fn data_tick_interval(mut self, interval: Duration) -> Self {
        self.data_interval = clamp_tick_interval(interval);
        self
    }

    /// Ohmeter producer period, clamped like the data period
    pub fn ohmeter_tick_interval(mut self, interval: Duration) -> Self {
        self.ohmeter_interval = clamp_tick_interval(interval);
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Inject capabilities registered after the hardware's own on every connect
    pub fn provider<P>(mut self, provider: P) -> Self
    where
        P: CapabilityProvider + 'static,
    {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// Apply loaded device settings
    pub fn settings(mut self, settings: &DeviceSettings) -> Self {
        if let Some(id) = &settings.id {
            self.id = Some(id.clone());
        }
        self.event_buffer = settings.event_buffer;
        self.data_tick_interval(settings.data_tick_interval())
            .ohmeter_tick_interval(settings.ohmeter_tick_interval())
    }

    pub fn build(self) -> AcquisitionDevice<H> {
        let id = self
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        AcquisitionDevice {
            id,
            hardware: Arc::new(Mutex::new(self.hardware)),
            lifecycle: Mutex::new(Lifecycle::default()),
            status: RwLock::new(DeviceStatus::default()),
            channels: Mutex::new(ChannelCollection::new()),
            registry: RwLock::new(None),
            session: RwLock::new(None),
            producing: RwLock::new(None),
            dispatcher: Arc::new(EventDispatcher::new(self.event_buffer)),
            providers: self.providers,
            clock: self.clock,
            data_interval: self.data_interval,
            ohmeter_interval: self.ohmeter_interval,
        }
    }
}

/// Protocol-agnostic acquisition device
pub struct AcquisitionDevice<H: AcquisitionHardware> {
    id: String,
    hardware: HardwareHandle<H>,
    lifecycle: Mutex<Lifecycle>,
    status: RwLock<DeviceStatus>,
    channels: Mutex<ChannelCollection>,
    registry: RwLock<Option<Arc<CapabilityRegistry>>>,
    session: RwLock<Option<Arc<dyn TelemetrySession>>>,
    /// Running flag of the current producer, readable without the transition lock
    producing: RwLock<Option<Arc<AtomicBool>>>,
    dispatcher: Arc<EventDispatcher>,
    providers: Vec<Arc<dyn CapabilityProvider>>,
    clock: Arc<dyn TimeProvider>,
    data_interval: Duration,
    ohmeter_interval: Duration,
}

impl<H: AcquisitionHardware> AcquisitionDevice<H> {
    /// Device with default settings
    pub fn new(hardware: H) -> Self {
        DeviceBuilder::new(hardware).build()
    }

    pub fn builder(hardware: H) -> DeviceBuilder<H> {
        DeviceBuilder::new(hardware)
    }

    // ---- transitions ----------------------------------------------------

    /// Connect the transport, start the telemetry session and build the
    /// capability registry. Any failure rolls back to Disconnected.
    pub fn connect(&self) -> AcqResult<()> {
        let span = tracing::info_span!("connect", device_id = %self.id);
        let _enter = span.enter();

        let mut lifecycle = self.lock_lifecycle("connect")?;
        if self.status.read().is_connected() {
            return Err(AcqError::state("connect", "device is already connected"));
        }

        self.hardware.lock().connect_core().transport_err("connect")?;

        let session = self.hardware.lock().create_session();
        if let Err(err) = session.start() {
            self.rollback_connect(None);
            return Err(err.into());
        }

        let registry = match self.build_registry() {
            Ok(registry) => registry,
            Err(err) => {
                self.rollback_connect(Some(&session));
                return Err(err);
            }
        };

        tracing::info!(capabilities = ?registry.names(), "device connected");
        *self.registry.write() = Some(Arc::new(registry));
        record_counter(&*session, keys::CONNECT, 1);
        *self.session.write() = Some(session);
        lifecycle.epoch_nanos = self.clock.now_nanos();

        let mut status = self.status.write();
        status.reset();
        status.connection = ConnectionState::Connected;
        Ok(())
    }

    /// Validate the channel configuration and push it to the hardware.
    ///
    /// Runs the `FirmwareUpdate` capability first when it is enabled.
    pub fn setup(&self) -> AcqResult<()> {
        let span = tracing::info_span!("setup", device_id = %self.id);
        let _enter = span.enter();

        let mut lifecycle = self.lock_lifecycle("setup")?;
        {
            let status = self.status.read();
            if !status.is_connected() {
                return Err(AcqError::state("setup", "device is not connected"));
            }
            if status.is_setup() {
                return Err(AcqError::state("setup", "device is already set up"));
            }
        }

        let multi_frequency = self.hardware.lock().supports_multi_frequency();
        let channels = self.channels.lock().validate_for_setup(multi_frequency)?;

        let registry = self.current_registry("setup")?;
        if registry.is_enabled(features::FIRMWARE_UPDATE) {
            tracing::info!("running firmware update");
            let updated = registry.invoke(features::FIRMWARE_UPDATE)?;
            self.record(&keys::capability(features::FIRMWARE_UPDATE));
            if !updated {
                return Err(AcqError::CapabilityFailed(
                    features::FIRMWARE_UPDATE.to_string(),
                ));
            }
        }

        self.hardware
            .lock()
            .setup_core(&channels)
            .transport_err("setup")?;

        tracing::info!(channels = channels.len(), multi_frequency, "device set up");
        lifecycle.configured = Some(channels);
        self.record(keys::SETUP);

        let mut status = self.status.write();
        status.setup = SetupState::Setup;
        status.mode = AcquisitionMode::Idle;
        Ok(())
    }

    /// Switch acquisition mode. Switching to the current mode is a no-op.
    pub fn change_acquisition_mode(&self, mode: AcquisitionMode) -> AcqResult<()> {
        let span = tracing::info_span!("change_acquisition_mode", device_id = %self.id, mode = %mode);
        let _enter = span.enter();

        let mut lifecycle = self.lock_lifecycle("change acquisition mode")?;
        {
            let status = self.status.read();
            if !status.is_connected() {
                return Err(AcqError::state(
                    "change acquisition mode",
                    "device is not connected",
                ));
            }
            if !status.is_setup() {
                return Err(AcqError::state(
                    "change acquisition mode",
                    "device is not set up",
                ));
            }
            if status.mode == mode {
                tracing::debug!("already in requested mode");
                return Ok(());
            }
        }

        let registry = self.current_registry("change acquisition mode")?;
        if mode.measures_impedance() && !registry.is_enabled(features::OHMETER) {
            return Err(AcqError::UnsupportedFeature(features::OHMETER.to_string()));
        }

        if let Some(mut producer) = self.take_producer(&mut lifecycle) {
            if let Err(err) = producer.stop() {
                tracing::warn!(error = %err, "previous producer did not stop cleanly");
            }
        }
        self.status.write().mode = AcquisitionMode::Idle;

        self.hardware
            .lock()
            .change_acquisition_mode_core(&mode)
            .transport_err("change acquisition mode")?;

        // the hardware is in `mode` now; anything failing below must put it back
        let producer = match self.enter_mode(&mode, &registry, &lifecycle) {
            Ok(producer) => producer,
            Err(err) => {
                self.restore_idle_hardware();
                return Err(err);
            }
        };
        if let Some(producer) = &producer {
            *self.producing.write() = Some(producer.running_flag());
        }
        lifecycle.producer = producer;
        self.record(keys::MODE_CHANGE);

        tracing::info!("acquisition mode changed");
        self.status.write().mode = mode;
        Ok(())
    }

    /// Stop producers, disconnect the transport and release the session.
    ///
    /// Every step runs even if an earlier one failed. Disconnecting a
    /// disconnected device is a no-op.
    pub fn disconnect(&self) -> AcqResult<()> {
        let span = tracing::info_span!("disconnect", device_id = %self.id);
        let _enter = span.enter();

        let mut lifecycle = self.lock_lifecycle("disconnect")?;
        if !self.status.read().is_connected() {
            return Ok(());
        }
        let result = self.teardown(&mut lifecycle);
        tracing::info!(clean = result.is_ok(), "device disconnected");
        result
    }

    /// Dispose the device. Further operations fail; closing twice is a no-op.
    pub fn close(&self) -> AcqResult<()> {
        let span = tracing::info_span!("close", device_id = %self.id);
        let _enter = span.enter();

        let mut lifecycle = self.lifecycle_guard("close")?;
        if lifecycle.disposed {
            return Ok(());
        }
        let result = self.teardown(&mut lifecycle);
        lifecycle.disposed = true;
        self.status.write().disposed = true;
        tracing::info!("device disposed");
        result
    }

    // ---- capabilities ---------------------------------------------------

    pub fn is_feature_available(&self, name: &str) -> bool {
        self.registry_snapshot()
            .is_some_and(|registry| registry.is_available(name))
    }

    pub fn is_feature_enabled(&self, name: &str) -> bool {
        self.registry_snapshot()
            .is_some_and(|registry| registry.is_enabled(name))
    }

    /// Invoke a capability directly, returning what its action reported
    pub fn perform_feature(&self, name: &str) -> AcqResult<bool> {
        if self.status.read().disposed {
            return Err(AcqError::state("perform feature", "device has been disposed"));
        }
        let registry = self
            .registry_snapshot()
            .ok_or_else(|| AcqError::state("perform feature", "device is not connected"))?;
        let result = registry.invoke(name)?;
        self.record(&keys::capability(name));
        Ok(result)
    }

    /// Registered capability names, empty while disconnected
    pub fn capability_names(&self) -> Vec<String> {
        self.registry_snapshot()
            .map(|registry| registry.names().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    // ---- channels -------------------------------------------------------

    pub fn add_channel(&self, channel: Channel) -> AcqResult<()> {
        self.ensure_not_disposed("add channel")?;
        self.channels.lock().add(channel)?;
        Ok(())
    }

    pub fn remove_channel(&self, id: ChannelId) -> AcqResult<Channel> {
        self.ensure_not_disposed("remove channel")?;
        Ok(self.channels.lock().remove(id)?)
    }

    pub fn update_channel<F>(&self, id: ChannelId, f: F) -> AcqResult<()>
    where
        F: FnOnce(&mut Channel) -> Result<(), ValidationError>,
    {
        self.ensure_not_disposed("update channel")?;
        self.channels.lock().update(id, f)?;
        Ok(())
    }

    pub fn clear_channels(&self) -> AcqResult<()> {
        self.ensure_not_disposed("clear channels")?;
        self.channels.lock().clear()?;
        Ok(())
    }

    /// Freeze the channel collection
    pub fn seal_channels(&self) -> Arc<[Channel]> {
        self.channels.lock().seal()
    }

    pub fn is_sealed(&self) -> bool {
        self.channels.lock().is_sealed()
    }

    /// Copy of the channels in insertion order
    pub fn channels(&self) -> Vec<Channel> {
        self.channels.lock().as_slice().to_vec()
    }

    pub fn channel(&self, id: ChannelId) -> Option<Channel> {
        self.channels.lock().get(id).cloned()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    // ---- events ---------------------------------------------------------

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        self.dispatcher.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.dispatcher.remove_listener(id)
    }

    pub fn subscribe(&self) -> Receiver<DeviceEvent> {
        self.dispatcher.subscribe()
    }

    pub fn subscribe_unbounded(&self) -> Receiver<DeviceEvent> {
        self.dispatcher.subscribe_unbounded()
    }

    // ---- state ----------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> DeviceStatus {
        self.status.read().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.status.read().connection
    }

    pub fn setup_state(&self) -> SetupState {
        self.status.read().setup
    }

    pub fn acquisition_mode(&self) -> AcquisitionMode {
        self.status.read().mode.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.read().is_connected()
    }

    pub fn is_disposed(&self) -> bool {
        self.status.read().disposed
    }

    /// Whether a producer thread is currently running. Never waits on a
    /// transition.
    pub fn is_producing(&self) -> bool {
        self.producing
            .read()
            .as_ref()
            .is_some_and(|running| running.load(Ordering::Acquire))
    }

    pub fn info(&self) -> DeviceInfo {
        self.hardware.lock().info()
    }

    pub fn with_hardware<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.hardware.lock())
    }

    pub fn with_hardware_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.hardware.lock())
    }

    // ---- internals ------------------------------------------------------

    /// Transition lock. Producer threads never block on it, since the
    /// holder may be waiting for them to stop.
    fn lifecycle_guard(&self, operation: &'static str) -> AcqResult<MutexGuard<'_, Lifecycle>> {
        if producer::on_producer_thread() {
            self.lifecycle
                .try_lock()
                .ok_or_else(|| AcqError::state(operation, "another transition is in progress"))
        } else {
            Ok(self.lifecycle.lock())
        }
    }

    fn lock_lifecycle(&self, operation: &'static str) -> AcqResult<MutexGuard<'_, Lifecycle>> {
        let lifecycle = self.lifecycle_guard(operation)?;
        if lifecycle.disposed {
            return Err(AcqError::state(operation, "device has been disposed"));
        }
        Ok(lifecycle)
    }

    fn ensure_not_disposed(&self, operation: &'static str) -> AcqResult<()> {
        if self.status.read().disposed {
            return Err(AcqError::state(operation, "device has been disposed"));
        }
        Ok(())
    }

    fn take_producer(&self, lifecycle: &mut Lifecycle) -> Option<PeriodicProducer> {
        self.producing.write().take();
        lifecycle.producer.take()
    }

    /// Steps of a mode change that run after the hardware hook succeeded
    fn enter_mode(
        &self,
        mode: &AcquisitionMode,
        registry: &CapabilityRegistry,
        lifecycle: &Lifecycle,
    ) -> AcqResult<Option<PeriodicProducer>> {
        if mode.measures_impedance() {
            let measured = registry.invoke(features::OHMETER)?;
            self.record(&keys::capability(features::OHMETER));
            if !measured {
                return Err(AcqError::CapabilityFailed(features::OHMETER.to_string()));
            }
        }
        if !mode.streams_data() && !mode.measures_impedance() {
            return Ok(None);
        }

        let channels = lifecycle
            .configured
            .clone()
            .ok_or_else(|| AcqError::state("change acquisition mode", "device is not set up"))?;
        let session = self
            .session_snapshot()
            .ok_or_else(|| AcqError::state("change acquisition mode", "telemetry session missing"))?;
        let epoch = lifecycle.epoch_nanos;

        let producer = if mode.streams_data() {
            self.spawn_data_producer(mode.clone(), channels, session, epoch)?
        } else {
            self.spawn_impedance_producer(channels, session, epoch)?
        };
        Ok(Some(producer))
    }

    /// Best effort: the device reports Idle, so the hardware should be too
    fn restore_idle_hardware(&self) {
        if let Err(err) = self
            .hardware
            .lock()
            .change_acquisition_mode_core(&AcquisitionMode::Idle)
        {
            tracing::warn!(error = %err, "could not return hardware to idle");
        }
    }

    fn session_snapshot(&self) -> Option<Arc<dyn TelemetrySession>> {
        self.session.read().clone()
    }

    /// Count one occurrence of `key` on the current session
    fn record(&self, key: &str) {
        if let Some(session) = self.session_snapshot() {
            record_counter(&*session, key, 1);
        }
    }

    fn registry_snapshot(&self) -> Option<Arc<CapabilityRegistry>> {
        self.registry.read().clone()
    }

    fn current_registry(&self, operation: &'static str) -> AcqResult<Arc<CapabilityRegistry>> {
        self.registry_snapshot()
            .ok_or_else(|| AcqError::state(operation, "capability registry missing"))
    }

    fn build_registry(&self) -> AcqResult<CapabilityRegistry> {
        let mut builder = CapabilityRegistry::builder();
        H::register_capabilities(&self.hardware, &mut builder)?;
        for provider in &self.providers {
            provider.register(&mut builder)?;
        }
        Ok(builder.build())
    }

    /// Undo a partially completed connect
    fn rollback_connect(&self, session: Option<&Arc<dyn TelemetrySession>>) {
        if let Some(session) = session {
            if let Err(err) = session.stop() {
                tracing::warn!(error = %err, "telemetry session stop failed during rollback");
            }
        }
        if let Err(err) = self.hardware.lock().disconnect_core() {
            tracing::warn!(error = %err, "transport disconnect failed during rollback");
        }
        tracing::warn!("connect rolled back");
    }

    fn teardown(&self, lifecycle: &mut Lifecycle) -> AcqResult<()> {
        let was_connected = self.status.read().is_connected();
        let mut errors = Vec::new();

        self.record(keys::DISCONNECT);

        for step in TeardownStep::ORDER {
            let outcome = match step {
                TeardownStep::StopProducers => match self.take_producer(lifecycle) {
                    Some(mut producer) => producer.stop(),
                    None => Ok(()),
                },
                TeardownStep::TransportDisconnect if was_connected => self
                    .hardware
                    .lock()
                    .disconnect_core()
                    .transport_err("disconnect"),
                TeardownStep::TransportDisconnect => Ok(()),
                TeardownStep::ReleaseSession => match self.session.write().take() {
                    Some(session) => session.stop().map_err(AcqError::from),
                    None => Ok(()),
                },
                TeardownStep::DiscardRegistry => {
                    self.registry.write().take();
                    Ok(())
                }
            };

            if let Err(err) = outcome {
                tracing::warn!(step = ?step, error = %err, "teardown step failed");
                errors.push(err);
            }
        }

        lifecycle.configured = None;
        self.status.write().reset();
        AcqError::from_teardown(errors)
    }

    fn spawn_data_producer(
        &self,
        mode: AcquisitionMode,
        channels: Arc<[Channel]>,
        session: Arc<dyn TelemetrySession>,
        epoch_nanos: u64,
    ) -> AcqResult<PeriodicProducer> {
        let hardware = self.hardware.clone();
        let dispatcher = self.dispatcher.clone();
        let clock = self.clock.clone();
        let device_id = self.id.clone();
        let interval = self.data_interval;
        let clamp = TimestampClamp::new(epoch_nanos);
        let mut sequence = 0u64;

        PeriodicProducer::spawn(format!("{}-data", self.id), interval, move || {
            let block = hardware.lock().acquire_block(&channels, interval);
            let timestamp = clamp.stamp(clock.now_nanos());

            match block {
                Ok(samples) if samples.nrows() == channels.len() => {
                    let packet = DataPacket {
                        device_id: device_id.clone(),
                        sequence,
                        timestamp,
                        mode: mode.clone(),
                        samples,
                    };
                    sequence += 1;
                    record_counter(&*session, keys::DATA_PACKETS, 1);
                    dispatcher.emit(DeviceEvent::Data(Arc::new(packet)));
                }
                Ok(samples) => {
                    tracing::warn!(
                        device_id = %device_id,
                        rows = samples.nrows(),
                        channels = channels.len(),
                        "dropping block with wrong row count"
                    );
                    record_counter(&*session, keys::PRODUCER_ERRORS, 1);
                }
                Err(err) => {
                    tracing::warn!(device_id = %device_id, error = %err, "block read failed");
                    record_counter(&*session, keys::PRODUCER_ERRORS, 1);
                }
            }
        })
    }

    fn spawn_impedance_producer(
        &self,
        channels: Arc<[Channel]>,
        session: Arc<dyn TelemetrySession>,
        epoch_nanos: u64,
    ) -> AcqResult<PeriodicProducer> {
        let hardware = self.hardware.clone();
        let dispatcher = self.dispatcher.clone();
        let clock = self.clock.clone();
        let device_id = self.id.clone();
        let clamp = TimestampClamp::new(epoch_nanos);
        let mut sequence = 0u64;

        PeriodicProducer::spawn(
            format!("{}-ohmeter", self.id),
            self.ohmeter_interval,
            move || {
                let values = hardware.lock().measure_impedance(&channels);
                let timestamp = clamp.stamp(clock.now_nanos());

                match values {
                    Ok(values) if values.len() == channels.len() => {
                        let packet = ImpedancePacket {
                            device_id: device_id.clone(),
                            sequence,
                            timestamp,
                            values,
                        };
                        sequence += 1;
                        record_counter(&*session, keys::IMPEDANCE_PACKETS, 1);
                        dispatcher.emit(DeviceEvent::Impedance(Arc::new(packet)));
                    }
                    Ok(values) => {
                        tracing::warn!(
                            device_id = %device_id,
                            values = values.len(),
                            channels = channels.len(),
                            "dropping impedance reading with wrong value count"
                        );
                        record_counter(&*session, keys::PRODUCER_ERRORS, 1);
                    }
                    Err(err) => {
                        tracing::warn!(device_id = %device_id, error = %err, "impedance read failed");
                        record_counter(&*session, keys::PRODUCER_ERRORS, 1);
                    }
                }
            },
        )
    }
}

impl<H: AcquisitionHardware> Drop for AcquisitionDevice<H> {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut();
        if lifecycle.disposed {
            return;
        }
        let mut lifecycle = std::mem::take(lifecycle);
        if let Err(err) = self.teardown(&mut lifecycle) {
            tracing::warn!(device_id = %self.id, error = %err, "teardown on drop failed");
        }
        lifecycle.disposed = true;
        *self.lifecycle.get_mut() = lifecycle;
    }
}

impl<H: AcquisitionHardware> std::fmt::Debug for AcquisitionDevice<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionDevice")
            .field("id", &self.id)
            .field("status", &*self.status.read())
            .finish_non_exhaustive()
    }
}
