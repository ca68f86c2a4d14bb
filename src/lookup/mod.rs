//! Device discovery: find the port a known device answers on.
//!
//! [`SerialPortLookup`] scans the enumerable port names, builds a candidate
//! connection for each, and runs a caller-supplied [`DeviceQuery`] over the
//! opened candidate. The first affirmative answer wins; rejected candidates
//! are closed and the scan moves on. No candidate failure escapes the scan.

use crate::connection::{ConnectionFactory, ConnectionInfo, SerialConnection};
use crate::transport::PortError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Enumerates available serial port names.
pub trait PortsEnumerator: Send + Sync {
    /// The port names to scan, in precedence order.
    fn available_port_names(&self) -> Vec<String>;
}

/// [`PortsEnumerator`] backed by the OS port listing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPortsEnumerator;

impl PortsEnumerator for SystemPortsEnumerator {
    fn available_port_names(&self) -> Vec<String> {
        match tokio_serial::available_ports() {
            Ok(ports) => ports.into_iter().map(|port| port.port_name).collect(),
            Err(e) => {
                warn!(error = %e, "failed to enumerate serial ports");
                Vec::new()
            }
        }
    }
}

/// Verifies whether the expected device answers on a connection.
///
/// The probe protocol (what gets sent, what counts as a match) is entirely
/// the implementor's business; the lookup only interprets the outcome.
/// Errors are treated the same as a negative answer.
#[async_trait]
pub trait DeviceQuery: Send + Sync {
    /// Run the probe over an opened connection.
    async fn execute(&self, connection: &SerialConnection) -> Result<bool, PortError>;
}

/// Scans candidate ports for the one a device query accepts.
pub struct SerialPortLookup {
    enumerator: Arc<dyn PortsEnumerator>,
    factory: Arc<dyn ConnectionFactory>,
}

impl SerialPortLookup {
    /// Lookup over the given enumerator and factory.
    pub fn new(enumerator: Arc<dyn PortsEnumerator>, factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            enumerator,
            factory,
        }
    }

    /// The enumerator candidates are drawn from.
    pub fn enumerator(&self) -> &Arc<dyn PortsEnumerator> {
        &self.enumerator
    }

    /// The factory candidates are built with.
    pub fn factory(&self) -> &Arc<dyn ConnectionFactory> {
        &self.factory
    }

    /// Find the first port whose device answers `query` affirmatively.
    ///
    /// `info`'s port name field is ignored; each candidate is built from a
    /// copy of `info` bound to the candidate's name. Candidates are probed
    /// one at a time in enumerator order, and the scan stops at the first
    /// match, which is returned still open. Candidates that fail to build,
    /// open, or answer are skipped, closed, and never propagated.
    pub async fn find_port(
        &self,
        info: &ConnectionInfo,
        query: &dyn DeviceQuery,
    ) -> Option<Arc<SerialConnection>> {
        for port_name in self.enumerator.available_port_names() {
            let candidate_info = info.with_port_name(&port_name);
            let connection = match self.factory.create_connection(&candidate_info) {
                Ok(connection) => connection,
                Err(e) => {
                    debug!(port = %port_name, error = %e, "candidate construction failed");
                    continue;
                }
            };

            if probe(&connection, query).await {
                info!(port = %port_name, "device query matched");
                return Some(connection);
            }

            debug!(port = %port_name, "candidate rejected");
            if let Err(e) = connection.close().await {
                debug!(port = %port_name, error = %e, "failed to close rejected candidate");
            }
        }

        None
    }
}

/// Open a candidate and run the query; any failure counts as a mismatch.
async fn probe(connection: &Arc<SerialConnection>, query: &dyn DeviceQuery) -> bool {
    if let Err(e) = connection.open().await {
        debug!(port = %connection.connection_info().port_name, error = %e, "candidate failed to open");
        return false;
    }

    match query.execute(connection).await {
        Ok(answered) => answered,
        Err(e) => {
            debug!(
                port = %connection.connection_info().port_name,
                error = %e,
                "device query failed"
            );
            false
        }
    }
}
