// src/device/producer.rs
//! Timer-driven worker threads

use crate::error::{AcqError, AcqResult};
use crossbeam::channel::{self, Sender, TryRecvError};
use crossbeam::select;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

thread_local! {
    static ON_PRODUCER: Cell<bool> = const { Cell::new(false) };
}

/// True when called from inside a producer tick
pub fn on_producer_thread() -> bool {
    ON_PRODUCER.with(Cell::get)
}

/// One dedicated thread running `tick` once per interval.
///
/// Ticks never overlap. After [`stop`](Self::stop) returns no further tick
/// starts, and unless stop was requested from the producer thread itself,
/// the running tick has finished too.
#[derive(Debug)]
pub struct PeriodicProducer {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

/// Clears the running flag when the thread exits, panics included
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PeriodicProducer {
    pub fn spawn<F>(name: impl Into<String>, interval: Duration, mut tick: F) -> AcqResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let ticker = channel::tick(interval);
        let running = Arc::new(AtomicBool::new(true));
        let guard = RunningGuard(running.clone());

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _guard = guard;
                ON_PRODUCER.with(|flag| flag.set(true));
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            // stop wins over a tick that became ready at the same time
                            if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                                break;
                            }
                            tick();
                        }
                    }
                }
            })
            .map_err(|err| AcqError::Producer {
                name: name.clone(),
                reason: format!("failed to spawn thread: {}", err),
            })?;

        tracing::debug!(producer = %name, interval_ms = interval.as_millis() as u64, "producer started");
        Ok(Self {
            name,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            running,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flag that stays readable without access to the producer itself
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Stop the thread and wait for it. Idempotent.
    pub fn stop(&mut self) -> AcqResult<()> {
        // dropping the sender disconnects the stop channel
        self.stop_tx.take();

        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        if handle.thread().id() == thread::current().id() {
            tracing::debug!(producer = %self.name, "stop requested from producer thread, detaching");
            return Ok(());
        }

        handle.join().map_err(|_| AcqError::Producer {
            name: self.name.clone(),
            reason: "producer thread panicked".to_string(),
        })?;
        tracing::debug!(producer = %self.name, "producer stopped");
        Ok(())
    }
}

impl Drop for PeriodicProducer {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(error = %err, "producer did not stop cleanly");
        }
    }
}
