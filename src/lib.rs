//! Serial Link Library
//!
//! Host-side management of RS-232-style serial links: a pool of named
//! connections, asynchronous send/receive with multi-handler data-received
//! fan-out, DTR/RTS control-pin signaling with minimum-hold timing, and
//! device-query-based port discovery.
//!
//! # Modules
//!
//! - `config`: TOML-backed connection profiles
//! - `connection`: connections, the factory, and the connection pool
//! - `constants`: timing constants
//! - `control`: control-pin identities, states, and the timed pin manager
//! - `delay`: the awaitable pause capability
//! - `lookup`: device-query port discovery
//! - `transport`: the serial transport trait, system port, and mock
//!
//! # Example
//!
//! ```no_run
//! use serial_link::{ConnectionInfo, ConnectionPool, ControlPinManager};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ConnectionPool::new();
//! let info = ConnectionInfo::new("/dev/ttyUSB0", 115_200);
//!
//! let connection = pool.create_connection(&info)?;
//! connection.open().await?;
//!
//! // Pulse DTR; holds shorter than the minimum switch time are clamped.
//! connection
//!     .dtr_pin_manager()
//!     .enable_pin_for(Duration::from_millis(50))
//!     .await?;
//!
//! connection.send_data(b"PING\r\n").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod constants;
pub mod control;
pub mod delay;
pub mod lookup;
pub mod transport;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ConnectionProfile, LinkConfig};
pub use connection::{
    ConnectionFactory, ConnectionInfo, ConnectionPool, DataReceivedEvent, DataReceivedHandler,
    PoolError, SerialConnection, SystemConnectionFactory,
};
pub use constants::MINIMUM_SIGNAL_SWITCH_TIME;
pub use control::{
    ControlPin, ControlPinManager, PinSignalSender, PinState, SerialControlPinManager,
};
pub use delay::{Delay, RecordingDelay, TokioDelay};
pub use lookup::{DeviceQuery, PortsEnumerator, SerialPortLookup, SystemPortsEnumerator};
pub use transport::{
    DataBits, FlowControl, MockSerialTransport, Parity, PortError, SerialTransport, StopBits,
    TokioSerialTransport, TransportEvent,
};
