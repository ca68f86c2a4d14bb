//! Shared test utilities: scripted factories and mock-backed connections.

#![allow(dead_code)]

use parking_lot::Mutex;
use serial_link::{
    ConnectionFactory, ConnectionInfo, ControlPin, ControlPinManager, Delay, MockSerialTransport,
    PinSignalSender, PortError, SerialConnection, SerialControlPinManager, SerialTransport,
    TokioDelay,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a test-writer tracing subscriber once per test binary.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a mock-backed connection, returning the mock for inspection.
pub fn mock_connection(info: &ConnectionInfo) -> (Arc<SerialConnection>, MockSerialTransport) {
    mock_connection_with_delay(info, Arc::new(TokioDelay))
}

/// Build a mock-backed connection with a specific delay provider.
pub fn mock_connection_with_delay(
    info: &ConnectionInfo,
    delay: Arc<dyn Delay>,
) -> (Arc<SerialConnection>, MockSerialTransport) {
    let mock = MockSerialTransport::new(&info.port_name);
    let connection = connection_over(mock.clone(), info, delay);
    (connection, mock)
}

/// Wire pin managers and a connection over an existing mock transport.
pub fn connection_over(
    mock: MockSerialTransport,
    info: &ConnectionInfo,
    delay: Arc<dyn Delay>,
) -> Arc<SerialConnection> {
    let transport: Arc<dyn SerialTransport> = Arc::new(mock);
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
    Arc::new(SerialConnection::new(
        transport,
        info.clone(),
        dtr_manager,
        rts_manager,
        Some(dtr_sender),
        Some(rts_sender),
    ))
}

/// [`ConnectionFactory`] over scripted mock transports.
///
/// Ports can be pre-scripted with a configured mock (e.g. one that refuses
/// to open) or refused outright at construction time; everything else gets
/// a fresh well-behaved mock. The factory records the ports it was asked to
/// construct, in order.
#[derive(Default)]
pub struct ScriptedFactory {
    transports: Mutex<HashMap<String, MockSerialTransport>>,
    refused: Mutex<HashSet<String>>,
    created: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `transport` for its own port name instead of a fresh mock.
    pub fn script_port(&self, transport: MockSerialTransport) {
        self.transports
            .lock()
            .insert(transport.port_name().to_string(), transport);
    }

    /// Make construction fail for `port_name`.
    pub fn refuse_port(&self, port_name: &str) {
        self.refused.lock().insert(port_name.to_string());
    }

    /// Ports construction was attempted for, in order.
    pub fn created_ports(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    /// The mock transport handed out for `port_name`, if any.
    pub fn transport_for(&self, port_name: &str) -> Option<MockSerialTransport> {
        self.transports.lock().get(port_name).cloned()
    }
}

impl ConnectionFactory for ScriptedFactory {
    fn create_connection(
        &self,
        info: &ConnectionInfo,
    ) -> Result<Arc<SerialConnection>, PortError> {
        if self.refused.lock().contains(&info.port_name) {
            return Err(PortError::config("refused by scripted factory"));
        }
        self.created.lock().push(info.port_name.clone());

        let mock = self
            .transports
            .lock()
            .entry(info.port_name.clone())
            .or_insert_with(|| MockSerialTransport::new(&info.port_name))
            .clone();
        Ok(connection_over(mock, info, Arc::new(TokioDelay)))
    }
}
