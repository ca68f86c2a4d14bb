//! Serial connections: transport + pin managers + data-received fan-out.
//!
//! A [`SerialConnection`] composes one transport with a DTR and an RTS pin
//! manager and fans inbound data out to any number of registered handlers.
//! Connections are built by a [`factory`](crate::connection::factory),
//! registered in a [`pool`](crate::connection::pool), or discovered via
//! [`lookup`](crate::lookup).

pub mod factory;
pub mod info;
pub mod pool;

pub use factory::{ConnectionFactory, SystemConnectionFactory};
pub use info::ConnectionInfo;
pub use pool::{ConnectionPool, PoolError};

use crate::control::{ControlPinManager, PinSignalSender};
use crate::transport::{PortError, SerialTransport, TransportEvent};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A buffer of bytes drained from the transport, delivered to every
/// registered data-received handler.
#[derive(Debug, Clone)]
pub struct DataReceivedEvent {
    /// The received bytes. Shared between handler invocations.
    pub buffer: Arc<[u8]>,
}

/// Callback invoked for every drained receive buffer.
///
/// Each invocation runs on its own task: handlers must not assume any
/// ordering relative to each other, and a slow handler cannot block the
/// drain or its peers.
pub type DataReceivedHandler = Arc<dyn Fn(DataReceivedEvent) + Send + Sync>;

/// A serial connection over one exclusively owned transport.
///
/// The connection is the only component that mutates its transport; the
/// two pin managers share the transport but each manipulates only its own
/// control flag.
pub struct SerialConnection {
    transport: Arc<dyn SerialTransport>,
    info: ConnectionInfo,
    dtr_pin_manager: Arc<dyn ControlPinManager>,
    rts_pin_manager: Arc<dyn ControlPinManager>,
    dtr_signal_sender: Option<Arc<dyn PinSignalSender>>,
    rts_signal_sender: Option<Arc<dyn PinSignalSender>>,
    handlers: Arc<Mutex<BTreeMap<u64, DataReceivedHandler>>>,
    next_handler_id: AtomicU64,
    drain_task: Mutex<Option<JoinHandle<()>>>,
}

impl SerialConnection {
    /// Compose a connection from its parts.
    ///
    /// The signal senders are optional capabilities: pass `None` when the
    /// pin managers do not also send signals.
    pub fn new(
        transport: Arc<dyn SerialTransport>,
        info: ConnectionInfo,
        dtr_pin_manager: Arc<dyn ControlPinManager>,
        rts_pin_manager: Arc<dyn ControlPinManager>,
        dtr_signal_sender: Option<Arc<dyn PinSignalSender>>,
        rts_signal_sender: Option<Arc<dyn PinSignalSender>>,
    ) -> Self {
        Self {
            transport,
            info,
            dtr_pin_manager,
            rts_pin_manager,
            dtr_signal_sender,
            rts_signal_sender,
            handlers: Arc::new(Mutex::new(BTreeMap::new())),
            next_handler_id: AtomicU64::new(0),
            drain_task: Mutex::new(None),
        }
    }

    /// Open the connection and start draining inbound data to handlers.
    pub async fn open(&self) -> Result<(), PortError> {
        self.transport.open().await?;
        self.ensure_drain_task();
        Ok(())
    }

    /// Close the connection, discarding both buffers first.
    pub async fn close(&self) -> Result<(), PortError> {
        if self.transport.is_open() {
            self.transport.discard_in_buffer()?;
            self.transport.discard_out_buffer().await?;
        }
        self.transport.close().await
    }

    /// Send bytes over the connection, discarding any unsent output first.
    pub async fn send_data(&self, data: &[u8]) -> Result<(), PortError> {
        self.transport.discard_out_buffer().await?;
        self.transport.write(data).await
    }

    /// Register a data-received handler under a fresh id.
    ///
    /// Registering the same handler twice yields two registrations.
    pub fn register_data_received_handler(&self, handler: DataReceivedHandler) {
        let id = self.next_handler_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.lock().insert(id, handler);
    }

    /// Unregister a previously registered handler.
    ///
    /// Looks the handler up by identity and removes at most one
    /// registration; unknown handlers are ignored.
    pub fn unregister_data_received_handler(&self, handler: &DataReceivedHandler) {
        let mut handlers = self.handlers.lock();
        let id = handlers
            .iter()
            .find(|(_, registered)| Arc::ptr_eq(registered, handler))
            .map(|(id, _)| *id);
        if let Some(id) = id {
            handlers.remove(&id);
        }
    }

    /// Number of currently registered data-received handlers.
    pub fn data_received_handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// The parameters this connection was created from.
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// Manager for the DTR pin.
    pub fn dtr_pin_manager(&self) -> &Arc<dyn ControlPinManager> {
        &self.dtr_pin_manager
    }

    /// Manager for the RTS pin.
    pub fn rts_pin_manager(&self) -> &Arc<dyn ControlPinManager> {
        &self.rts_pin_manager
    }

    /// Signal-sender capability on the DTR pin, when available.
    pub fn dtr_signal_sender(&self) -> Option<&Arc<dyn PinSignalSender>> {
        self.dtr_signal_sender.as_ref()
    }

    /// Signal-sender capability on the RTS pin, when available.
    pub fn rts_signal_sender(&self) -> Option<&Arc<dyn PinSignalSender>> {
        self.rts_signal_sender.as_ref()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<dyn SerialTransport> {
        &self.transport
    }

    /// Whether the underlying transport is open.
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    fn ensure_drain_task(&self) {
        let mut task = self.drain_task.lock();
        let running = task.as_ref().is_some_and(|task| !task.is_finished());
        if !running {
            // Subscribe before spawning so no event raised after `open`
            // returns can be missed.
            let events = self.transport.subscribe();
            *task = Some(spawn_drain_task(
                events,
                Arc::clone(&self.transport),
                Arc::clone(&self.handlers),
            ));
        }
    }
}

impl Drop for SerialConnection {
    fn drop(&mut self) {
        if let Some(task) = self.drain_task.lock().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SerialConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialConnection")
            .field("info", &self.info)
            .field("open", &self.is_open())
            .field("handlers", &self.data_received_handler_count())
            .finish()
    }
}

/// Per-connection receive loop: on every data-received notification, drain
/// the transport's input buffer once and dispatch the bytes to every
/// registered handler on its own task.
fn spawn_drain_task(
    mut events: broadcast::Receiver<TransportEvent>,
    transport: Arc<dyn SerialTransport>,
    handlers: Arc<Mutex<BTreeMap<u64, DataReceivedHandler>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(TransportEvent::DataReceived) => {
                    let pending = transport.bytes_to_read();
                    if pending == 0 {
                        continue;
                    }
                    let mut buffer = vec![0u8; pending];
                    let drained = match transport.read(&mut buffer) {
                        Ok(n) => n,
                        Err(e) => {
                            warn!(error = %e, "failed to drain receive buffer");
                            continue;
                        }
                    };
                    buffer.truncate(drained);
                    let _ = transport.discard_in_buffer();

                    let payload: Arc<[u8]> = Arc::from(buffer);
                    let snapshot: Vec<DataReceivedHandler> =
                        handlers.lock().values().cloned().collect();
                    for handler in snapshot {
                        let event = DataReceivedEvent {
                            buffer: Arc::clone(&payload),
                        };
                        tokio::spawn(async move { handler(event) });
                    }
                }
                Ok(TransportEvent::ErrorReceived(message)) => {
                    debug!(%message, "transport reported an error");
                }
                Ok(TransportEvent::PinChanged(pin)) => {
                    debug!(%pin, "input control line changed");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "transport event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
