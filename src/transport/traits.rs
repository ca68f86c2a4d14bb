//! Core trait for serial transport abstraction.
//!
//! Defines the [`SerialTransport`] trait that allows both real serial ports
//! and mock implementations to be used interchangeably, plus the framing
//! parameter enums shared with [`ConnectionInfo`](crate::ConnectionInfo).

use super::error::PortError;
use crate::control::ControlPin;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Flow control (handshake) modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Notification raised by a transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// New bytes arrived in the receive buffer.
    DataReceived,
    /// The transport hit an I/O fault; the message describes it.
    ErrorReceived(String),
    /// An input control line changed level.
    PinChanged(ControlPin),
}

/// Capability contract for a serial byte-stream transport.
///
/// This is the seam between the connection layer and the platform serial
/// API: [`TokioSerialTransport`](super::TokioSerialTransport) implements it
/// over `tokio-serial`, and [`MockSerialTransport`](super::MockSerialTransport)
/// implements it in memory for tests.
///
/// Received bytes accumulate in the transport's input buffer; a
/// [`TransportEvent::DataReceived`] is broadcast whenever new bytes arrive,
/// after which `bytes_to_read`/`read`/`discard_in_buffer` operate on the
/// buffered data.
///
/// DTR and RTS are boolean enable flags. The getters report the last value
/// written through the corresponding setter (both start disabled); flags
/// may be written while the transport is closed and are applied when it
/// opens.
#[async_trait]
pub trait SerialTransport: Send + Sync + std::fmt::Debug {
    /// Open the underlying port.
    async fn open(&self) -> Result<(), PortError>;

    /// Close the underlying port. Closing a closed transport is a no-op.
    async fn close(&self) -> Result<(), PortError>;

    /// Write all of `data` to the port.
    async fn write(&self, data: &[u8]) -> Result<(), PortError>;

    /// Move buffered received bytes into `buffer`, returning how many were
    /// copied. Does not wait for data.
    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Discard all buffered received bytes.
    fn discard_in_buffer(&self) -> Result<(), PortError>;

    /// Discard bytes queued for transmission but not yet sent.
    async fn discard_out_buffer(&self) -> Result<(), PortError>;

    /// Set the DTR enable flag.
    async fn set_dtr(&self, enabled: bool) -> Result<(), PortError>;

    /// Last value written to the DTR enable flag.
    fn dtr(&self) -> bool;

    /// Set the RTS enable flag.
    async fn set_rts(&self, enabled: bool) -> Result<(), PortError>;

    /// Last value written to the RTS enable flag.
    fn rts(&self) -> bool;

    /// Number of received bytes currently buffered.
    fn bytes_to_read(&self) -> usize;

    /// Whether the transport is currently open.
    fn is_open(&self) -> bool;

    /// The name/path of the port this transport is bound to.
    fn port_name(&self) -> &str;

    /// Subscribe to transport notifications.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
}
