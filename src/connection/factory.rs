//! Construction of serial connections from declarative parameters.

use super::info::ConnectionInfo;
use super::SerialConnection;
use crate::control::{ControlPin, ControlPinManager, PinSignalSender, SerialControlPinManager};
use crate::delay::TokioDelay;
use crate::transport::{PortError, SerialTransport, TokioSerialTransport};
use std::sync::Arc;
use tracing::debug;

/// Creates a [`SerialConnection`] from a [`ConnectionInfo`].
///
/// Construction failures are returned, never panicked; the pool and lookup
/// convert them at their own boundaries.
pub trait ConnectionFactory: Send + Sync {
    /// Build an unopened connection for the described port.
    fn create_connection(&self, info: &ConnectionInfo)
        -> Result<Arc<SerialConnection>, PortError>;
}

/// [`ConnectionFactory`] producing system-port connections.
///
/// Builds a [`TokioSerialTransport`], wires a DTR and an RTS
/// [`SerialControlPinManager`] over it (also exposed as the connection's
/// signal senders), and leaves opening to the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConnectionFactory;

impl ConnectionFactory for SystemConnectionFactory {
    fn create_connection(
        &self,
        info: &ConnectionInfo,
    ) -> Result<Arc<SerialConnection>, PortError> {
        let transport: Arc<dyn SerialTransport> = Arc::new(TokioSerialTransport::new(info)?);
        let delay = Arc::new(TokioDelay);

        let dtr = Arc::new(SerialControlPinManager::new(
            ControlPin::Dtr,
            Arc::clone(&transport),
            delay.clone(),
        ));
        let rts = Arc::new(SerialControlPinManager::new(
            ControlPin::Rts,
            Arc::clone(&transport),
            delay,
        ));

        let dtr_manager: Arc<dyn ControlPinManager> = dtr.clone();
        let rts_manager: Arc<dyn ControlPinManager> = rts.clone();
        let dtr_sender: Arc<dyn PinSignalSender> = dtr;
        let rts_sender: Arc<dyn PinSignalSender> = rts;

        debug!(port = %info.port_name, baud = info.baud_rate, "connection created");
        Ok(Arc::new(SerialConnection::new(
            transport,
            info.clone(),
            dtr_manager,
            rts_manager,
            Some(dtr_sender),
            Some(rts_sender),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PinState;

    #[test]
    fn invalid_parameters_are_reported_not_panicked() {
        let factory = SystemConnectionFactory;
        let result = factory.create_connection(&ConnectionInfo::new("", 9600));
        assert!(matches!(result, Err(PortError::Config(_))));
    }

    #[test]
    fn wires_both_pin_managers_and_signal_senders() {
        let factory = SystemConnectionFactory;
        let info = ConnectionInfo::new("/dev/ttyUSB0", 115_200);

        let connection = factory.create_connection(&info).unwrap();

        assert_eq!(connection.connection_info(), &info);
        assert_eq!(connection.dtr_pin_manager().pin(), ControlPin::Dtr);
        assert_eq!(connection.rts_pin_manager().pin(), ControlPin::Rts);
        assert_eq!(connection.dtr_pin_manager().state(), PinState::Disabled);
        assert!(connection.dtr_signal_sender().is_some());
        assert!(connection.rts_signal_sender().is_some());
        assert!(!connection.is_open());
    }
}
