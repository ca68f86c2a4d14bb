//! Serial transport abstraction layer.
//!
//! Provides the [`SerialTransport`] capability trait together with the
//! tokio-serial system implementation and an in-memory mock, enabling
//! dependency injection and testing without hardware.

pub mod error;
pub mod mock;
pub mod tokio_port;
pub mod traits;

pub use error::PortError;
pub use mock::MockSerialTransport;
pub use tokio_port::TokioSerialTransport;
pub use traits::{DataBits, FlowControl, Parity, SerialTransport, StopBits, TransportEvent};
