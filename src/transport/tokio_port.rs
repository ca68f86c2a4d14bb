//! System serial transport backed by tokio-serial.
//!
//! The transport is constructed closed from a [`ConnectionInfo`] and opens
//! on demand. While open, a background I/O task owns the
//! `tokio_serial::SerialStream` exclusively: it drains arriving bytes into
//! the transport's receive buffer (broadcasting
//! [`TransportEvent::DataReceived`] per arrival) and services write,
//! control-flag, and buffer-discard commands sent from the transport
//! handle. This keeps reads, writes, and pin writes from contending for
//! the stream.

use super::error::PortError;
use super::traits::{SerialTransport, TransportEvent};
use crate::connection::ConnectionInfo;
use crate::constants::{EVENT_CHANNEL_CAPACITY, READ_CHUNK_SIZE};
use async_trait::async_trait;
use parking_lot::Mutex;
use serialport::SerialPort;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// State shared between the transport handle and its I/O task.
struct Shared {
    rx_buffer: Mutex<VecDeque<u8>>,
    events: broadcast::Sender<TransportEvent>,
}

/// Requests serviced by the I/O task.
enum PortCommand {
    Write(Vec<u8>, oneshot::Sender<Result<(), PortError>>),
    SetDtr(bool, oneshot::Sender<Result<(), PortError>>),
    SetRts(bool, oneshot::Sender<Result<(), PortError>>),
    DiscardOut(oneshot::Sender<Result<(), PortError>>),
    Shutdown(oneshot::Sender<()>),
}

struct IoHandle {
    commands: mpsc::Sender<PortCommand>,
    task: JoinHandle<()>,
}

/// [`SerialTransport`] over a system serial port.
///
/// DTR/RTS flags may be written while closed; the stored values are
/// applied to the port when it opens.
pub struct TokioSerialTransport {
    info: ConnectionInfo,
    shared: Arc<Shared>,
    dtr: AtomicBool,
    rts: AtomicBool,
    io: Mutex<Option<IoHandle>>,
}

impl TokioSerialTransport {
    /// Create a closed transport for the port described by `info`.
    ///
    /// Fails when the parameters cannot describe a port (empty name, zero
    /// baud rate); OS-level faults surface later, at `open`.
    pub fn new(info: &ConnectionInfo) -> Result<Self, PortError> {
        if info.port_name.is_empty() {
            return Err(PortError::config("port name must not be empty"));
        }
        if info.baud_rate == 0 {
            return Err(PortError::config("baud rate must be non-zero"));
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            info: info.clone(),
            shared: Arc::new(Shared {
                rx_buffer: Mutex::new(VecDeque::new()),
                events,
            }),
            dtr: AtomicBool::new(false),
            rts: AtomicBool::new(false),
            io: Mutex::new(None),
        })
    }

    /// The connection parameters this transport was built from.
    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    fn commands(&self) -> Result<mpsc::Sender<PortCommand>, PortError> {
        self.io
            .lock()
            .as_ref()
            .map(|handle| handle.commands.clone())
            .ok_or(PortError::NotOpen)
    }

    async fn roundtrip(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<(), PortError>>) -> PortCommand,
    ) -> Result<(), PortError> {
        let commands = self.commands()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        commands
            .send(build(reply_tx))
            .await
            .map_err(|_| PortError::IoTaskGone)?;
        reply_rx.await.map_err(|_| PortError::IoTaskGone)?
    }
}

#[async_trait]
impl SerialTransport for TokioSerialTransport {
    async fn open(&self) -> Result<(), PortError> {
        let mut io = self.io.lock();
        if io.is_some() {
            return Err(PortError::AlreadyOpen);
        }

        let mut builder = tokio_serial::new(&self.info.port_name, self.info.baud_rate);
        if let Some(data_bits) = self.info.data_bits {
            builder = builder.data_bits(convert_data_bits(data_bits));
        }
        if let Some(stop_bits) = self.info.stop_bits {
            builder = builder.stop_bits(convert_stop_bits(stop_bits));
        }
        if let Some(parity) = self.info.parity {
            builder = builder.parity(convert_parity(parity));
        }
        if let Some(flow_control) = self.info.flow_control {
            builder = builder.flow_control(convert_flow_control(flow_control));
        }

        let mut stream =
            tokio_serial::SerialStream::open(&builder).map_err(|e| match e.kind {
                tokio_serial::ErrorKind::NoDevice => PortError::not_found(&self.info.port_name),
                tokio_serial::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Io(std::io::Error::other(e.to_string())),
            })?;

        stream
            .write_data_terminal_ready(self.dtr.load(Ordering::SeqCst))
            .map_err(PortError::Serial)?;
        stream
            .write_request_to_send(self.rts.load(Ordering::SeqCst))
            .map_err(PortError::Serial)?;

        let (commands, command_rx) = mpsc::channel(16);
        let task = tokio::spawn(run_io_loop(stream, command_rx, Arc::clone(&self.shared)));
        *io = Some(IoHandle { commands, task });

        debug!(port = %self.info.port_name, "serial transport opened");
        Ok(())
    }

    async fn close(&self) -> Result<(), PortError> {
        let Some(handle) = self.io.lock().take() else {
            return Ok(());
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if handle.commands.send(PortCommand::Shutdown(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        } else {
            handle.task.abort();
        }
        let _ = handle.task.await;

        debug!(port = %self.info.port_name, "serial transport closed");
        Ok(())
    }

    async fn write(&self, data: &[u8]) -> Result<(), PortError> {
        self.roundtrip(|reply| PortCommand::Write(data.to_vec(), reply))
            .await
    }

    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut rx_buffer = self.shared.rx_buffer.lock();
        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match rx_buffer.pop_front() {
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
        self.shared.rx_buffer.lock().clear();
        Ok(())
    }

    async fn discard_out_buffer(&self) -> Result<(), PortError> {
        self.roundtrip(PortCommand::DiscardOut).await
    }

    async fn set_dtr(&self, enabled: bool) -> Result<(), PortError> {
        if self.is_open() {
            self.roundtrip(|reply| PortCommand::SetDtr(enabled, reply))
                .await?;
        }
        self.dtr.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn dtr(&self) -> bool {
        self.dtr.load(Ordering::SeqCst)
    }

    async fn set_rts(&self, enabled: bool) -> Result<(), PortError> {
        if self.is_open() {
            self.roundtrip(|reply| PortCommand::SetRts(enabled, reply))
                .await?;
        }
        self.rts.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn rts(&self) -> bool {
        self.rts.load(Ordering::SeqCst)
    }

    fn bytes_to_read(&self) -> usize {
        self.shared.rx_buffer.lock().len()
    }

    fn is_open(&self) -> bool {
        self.io.lock().is_some()
    }

    fn port_name(&self) -> &str {
        &self.info.port_name
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for TokioSerialTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.io.lock().take() {
            handle.task.abort();
        }
    }
}

impl std::fmt::Debug for TokioSerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSerialTransport")
            .field("port_name", &self.info.port_name)
            .field("baud_rate", &self.info.baud_rate)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Owns the stream while the port is open: drains arriving bytes into the
/// shared receive buffer and services commands from the transport handle.
async fn run_io_loop(
    mut stream: tokio_serial::SerialStream,
    mut command_rx: mpsc::Receiver<PortCommand>,
    shared: Arc<Shared>,
) {
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        tokio::select! {
            maybe_command = command_rx.recv() => {
                match maybe_command {
                    Some(PortCommand::Shutdown(ack)) => {
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => apply_command(&mut stream, command).await,
                    // All transport handles dropped; stop the loop.
                    None => break,
                }
            }
            result = stream.read(&mut chunk) => {
                match result {
                    Ok(0) => {
                        let _ = shared
                            .events
                            .send(TransportEvent::ErrorReceived("port closed by peer".into()));
                        break;
                    }
                    Ok(n) => {
                        shared.rx_buffer.lock().extend(&chunk[..n]);
                        let _ = shared.events.send(TransportEvent::DataReceived);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        warn!(error = %e, "serial read failed");
                        let _ = shared.events.send(TransportEvent::ErrorReceived(e.to_string()));
                        break;
                    }
                }
            }
        }
    }
}

async fn apply_command(stream: &mut tokio_serial::SerialStream, command: PortCommand) {
    match command {
        PortCommand::Write(data, reply) => {
            let result = stream.write_all(&data).await.map_err(PortError::Io);
            let _ = reply.send(result);
        }
        PortCommand::SetDtr(enabled, reply) => {
            let result = stream
                .write_data_terminal_ready(enabled)
                .map_err(PortError::Serial);
            let _ = reply.send(result);
        }
        PortCommand::SetRts(enabled, reply) => {
            let result = stream
                .write_request_to_send(enabled)
                .map_err(PortError::Serial);
            let _ = reply.send(result);
        }
        PortCommand::DiscardOut(reply) => {
            let result = stream
                .clear(serialport::ClearBuffer::Output)
                .map_err(PortError::Serial);
            let _ = reply.send(result);
        }
        // Intercepted by the loop; acknowledged here for completeness.
        PortCommand::Shutdown(ack) => {
            let _ = ack.send(());
        }
    }
}

// Helper conversion functions for tokio-serial types.

fn convert_data_bits(bits: crate::transport::DataBits) -> tokio_serial::DataBits {
    use crate::transport::DataBits;
    match bits {
        DataBits::Five => tokio_serial::DataBits::Five,
        DataBits::Six => tokio_serial::DataBits::Six,
        DataBits::Seven => tokio_serial::DataBits::Seven,
        DataBits::Eight => tokio_serial::DataBits::Eight,
    }
}

fn convert_stop_bits(bits: crate::transport::StopBits) -> tokio_serial::StopBits {
    use crate::transport::StopBits;
    match bits {
        StopBits::One => tokio_serial::StopBits::One,
        StopBits::Two => tokio_serial::StopBits::Two,
    }
}

fn convert_parity(parity: crate::transport::Parity) -> tokio_serial::Parity {
    use crate::transport::Parity;
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::Even => tokio_serial::Parity::Even,
    }
}

fn convert_flow_control(flow: crate::transport::FlowControl) -> tokio_serial::FlowControl {
    use crate::transport::FlowControl;
    match flow {
        FlowControl::None => tokio_serial::FlowControl::None,
        FlowControl::Software => tokio_serial::FlowControl::Software,
        FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
    }
}
