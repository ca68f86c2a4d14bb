//! Mock serial transport for testing.
//!
//! Provides a [`MockSerialTransport`] that simulates transport behavior
//! without hardware: scripted incoming bytes, a write log, an ordered
//! control-flag write log, and manual event triggering.

use super::error::PortError;
use super::traits::{SerialTransport, TransportEvent};
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::control::ControlPin;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Default)]
struct MockTransportState {
    open: bool,
    read_queue: VecDeque<u8>,
    write_log: Vec<Vec<u8>>,
    flag_writes: Vec<(ControlPin, bool)>,
    dtr: bool,
    rts: bool,
    in_buffer_discards: usize,
    out_buffer_discards: usize,
    fail_open: bool,
    fail_writes: bool,
}

/// In-memory [`SerialTransport`] for tests.
///
/// Clones share the same state, so a test can hold one handle while the
/// component under test holds another.
///
/// # Example
/// ```
/// use serial_link::transport::{MockSerialTransport, SerialTransport};
///
/// # tokio_test::block_on(async {
/// let transport = MockSerialTransport::new("MOCK0");
/// transport.open().await.unwrap();
///
/// transport.enqueue_incoming(b"PONG\r\n");
/// assert_eq!(transport.bytes_to_read(), 6);
///
/// transport.write(b"PING\r\n").await.unwrap();
/// assert_eq!(transport.write_log(), vec![b"PING\r\n".to_vec()]);
/// # });
/// ```
#[derive(Clone)]
pub struct MockSerialTransport {
    name: String,
    state: Arc<Mutex<MockTransportState>>,
    events: broadcast::Sender<TransportEvent>,
}

impl MockSerialTransport {
    /// Create a closed mock transport with the given port name.
    pub fn new(name: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockTransportState::default())),
            events,
        }
    }

    /// Append bytes to the receive buffer without raising an event.
    pub fn enqueue_incoming(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Broadcast a data-received notification.
    pub fn trigger_data_received(&self) {
        let _ = self.events.send(TransportEvent::DataReceived);
    }

    /// Append bytes to the receive buffer and raise a data-received event,
    /// the way a real port would on arrival.
    pub fn push_incoming(&self, data: &[u8]) {
        self.enqueue_incoming(data);
        self.trigger_data_received();
    }

    /// Broadcast an error notification.
    pub fn trigger_error(&self, message: impl Into<String>) {
        let _ = self
            .events
            .send(TransportEvent::ErrorReceived(message.into()));
    }

    /// Broadcast a pin-changed notification.
    pub fn trigger_pin_changed(&self, pin: ControlPin) {
        let _ = self.events.send(TransportEvent::PinChanged(pin));
    }

    /// Make subsequent `open` calls fail with a config error.
    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Make subsequent `write` calls fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Every buffer passed to `write`, in call order.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Every control-flag write as `(pin, value)`, in call order.
    pub fn flag_writes(&self) -> Vec<(ControlPin, bool)> {
        self.state.lock().flag_writes.clone()
    }

    /// How many times the input buffer was discarded.
    pub fn in_buffer_discards(&self) -> usize {
        self.state.lock().in_buffer_discards
    }

    /// How many times the output buffer was discarded.
    pub fn out_buffer_discards(&self) -> usize {
        self.state.lock().out_buffer_discards
    }
}

#[async_trait]
impl SerialTransport for MockSerialTransport {
    async fn open(&self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(PortError::config(format!(
                "mock port {} refuses to open",
                self.name
            )));
        }
        if state.open {
            return Err(PortError::AlreadyOpen);
        }
        state.open = true;
        Ok(())
    }

    async fn close(&self) -> Result<(), PortError> {
        self.state.lock().open = false;
        Ok(())
    }

    async fn write(&self, data: &[u8]) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(PortError::NotOpen);
        }
        if state.fail_writes {
            return Err(PortError::Io(std::io::Error::other("mock write failure")));
        }
        state.write_log.push(data.to_vec());
        Ok(())
    }

    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }
        Ok(bytes_read)
    }

    fn discard_in_buffer(&self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.read_queue.clear();
        state.in_buffer_discards += 1;
        Ok(())
    }

    async fn discard_out_buffer(&self) -> Result<(), PortError> {
        self.state.lock().out_buffer_discards += 1;
        Ok(())
    }

    async fn set_dtr(&self, enabled: bool) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.dtr = enabled;
        state.flag_writes.push((ControlPin::Dtr, enabled));
        Ok(())
    }

    fn dtr(&self) -> bool {
        self.state.lock().dtr
    }

    async fn set_rts(&self, enabled: bool) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.rts = enabled;
        state.flag_writes.push((ControlPin::Rts, enabled));
        Ok(())
    }

    fn rts(&self) -> bool {
        self.state.lock().rts
    }

    fn bytes_to_read(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn port_name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for MockSerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialTransport")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .field("bytes_to_read", &self.bytes_to_read())
            .finish()
    }
}
