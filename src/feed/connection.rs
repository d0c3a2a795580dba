//! Connection lifecycle for the sensor feed.
//!
//! A single background task owns the transport connection:
//!
//! ```text
//! Idle -> Connecting -> Open -> Closed --(reconnect delay)--> Connecting -> ...
//!                                  any state --stop()--> Stopped
//! ```
//!
//! Retry is unconditional with a fixed delay. `stop()` cancels the task,
//! including a pending retry wait, and waits for it to exit.

use super::aggregator::GroupAggregator;
use super::codec;
use super::transport::{Transport, TransportEvent, TransportStream};
use crate::config::FeedConfig;
use crate::error::{FeedError, Result};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on the close handshake during `stop()`.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle state of the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    /// Connection dropped; a reconnect is scheduled.
    Closed,
    Stopped,
}

impl ConnectionState {
    pub fn connectivity(self) -> ConnectivityState {
        match self {
            ConnectionState::Open => ConnectivityState::Connected,
            _ => ConnectivityState::Disconnected,
        }
    }
}

/// Whether the transport connection is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Disconnected,
    Connected,
}

enum Lifecycle {
    Idle,
    Running {
        cancel: CancellationToken,
        task: JoinHandle<()>,
    },
    Stopped,
}

/// Keeps one feed connection alive and routes its messages into a
/// [`GroupAggregator`].
pub struct ConnectionManager {
    config: FeedConfig,
    transport: Arc<dyn Transport>,
    aggregator: Arc<GroupAggregator>,
    state: Arc<watch::Sender<ConnectionState>>,
    lifecycle: Mutex<Lifecycle>,
}

impl ConnectionManager {
    pub fn new(
        config: FeedConfig,
        transport: Arc<dyn Transport>,
        aggregator: Arc<GroupAggregator>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            config,
            transport,
            aggregator,
            state: Arc::new(state),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn aggregator(&self) -> Arc<GroupAggregator> {
        self.aggregator.clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.state().connectivity()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Validate the configuration and spawn the connection task.
    ///
    /// Does nothing if already running. Must be called within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Running { .. } => return Ok(()),
            Lifecycle::Stopped => return Err(FeedError::Stopped),
            Lifecycle::Idle => {}
        }

        self.config.validate()?;

        info!("[Feed] Starting connection to {}", self.config.endpoint_address);
        self.state.send_replace(ConnectionState::Connecting);

        let cancel = CancellationToken::new();
        let worker = Worker {
            endpoint: self.config.endpoint_address.clone(),
            reconnect_delay: self.config.reconnect_delay(),
            transport: self.transport.clone(),
            aggregator: self.aggregator.clone(),
            state: self.state.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run());

        *lifecycle = Lifecycle::Running { cancel, task };
        Ok(())
    }

    /// Stop the connection task and any pending reconnect.
    ///
    /// Safe to call in any state. Once this returns, no further merges or
    /// state changes happen, and `start()` is refused.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Stopped);

        if let Lifecycle::Running { cancel, task } = previous {
            cancel.cancel();
            if let Err(e) = task.await {
                warn!("[Feed] Connection task ended abnormally: {}", e);
            }
            info!("[Feed] Connection manager stopped");
        }

        self.state.send_replace(ConnectionState::Stopped);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Lifecycle::Running { cancel, .. } = &*self.lifecycle.lock() {
            cancel.cancel();
        }
    }
}

/// State owned by the background connection task.
struct Worker {
    endpoint: String,
    reconnect_delay: Duration,
    transport: Arc<dyn Transport>,
    aggregator: Arc<GroupAggregator>,
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            debug!("[Feed] Connecting to {}", self.endpoint);

            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = self.transport.connect(&self.endpoint) => result,
            };

            match connected {
                Ok(mut stream) => {
                    info!("[Feed] Connected to {}", self.endpoint);
                    self.set_state(ConnectionState::Open);

                    if !self.pump(stream.as_mut()).await {
                        if tokio::time::timeout(CLOSE_TIMEOUT, stream.close()).await.is_err() {
                            warn!(
                                "[Feed] Close handshake with {} timed out, dropping connection",
                                self.endpoint
                            );
                        }
                        return;
                    }
                    info!("[Feed] Connection to {} closed", self.endpoint);
                }
                Err(e) => {
                    warn!("[Feed] Failed to connect to {}: {}", self.endpoint, e);
                }
            }

            self.set_state(ConnectionState::Closed);
            info!(
                "[Feed] Reconnecting in {} ms",
                self.reconnect_delay.as_millis()
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Route events until the connection closes. Returns `false` if cancelled.
    async fn pump(&self, stream: &mut dyn TransportStream) -> bool {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                event = stream.next_event() => event,
            };

            match event {
                TransportEvent::Message(payload) => self.handle_message(&payload),
                TransportEvent::Error(e) => warn!("[Feed] Transport error: {}", e),
                TransportEvent::Closed => return true,
            }
        }
    }

    fn handle_message(&self, payload: &[u8]) {
        match codec::decode(payload) {
            Ok(reading) => {
                debug!(
                    "[Feed] {} temperature {:.1}, humidity {:.1}",
                    reading.group_id, reading.temperature, reading.humidity
                );
                self.aggregator.merge(reading, Utc::now());
            }
            Err(e) => {
                warn!(
                    "[Feed] Dropping message: {} ({})",
                    e,
                    String::from_utf8_lossy(payload)
                );
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}
