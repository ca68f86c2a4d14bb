//! Keyed registry of live serial connections.
//!
//! The pool enforces one connection per port name and offers lookups by
//! port name, by full [`ConnectionInfo`] descriptor, and by connection
//! identity. The internal map is guarded by a mutex because every add is
//! a check-then-act sequence.

use super::factory::{ConnectionFactory, SystemConnectionFactory};
use super::info::ConnectionInfo;
use super::SerialConnection;
use crate::transport::PortError;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

static LOCAL_POOL: Lazy<ConnectionPool> = Lazy::new(ConnectionPool::new);

/// Errors surfaced by pool operations.
///
/// Callers must match the discriminator before touching a payload; no
/// operation hands out a default connection.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A connection is already registered under this port name.
    #[error("a connection already exists for port {0}")]
    ConnectionAlreadyExists(String),

    /// The factory could not build the connection. Not retried.
    #[error("failed to create connection")]
    FailedToCreateConnection(#[source] PortError),

    /// No connection matches the requested key.
    #[error("connection does not exist")]
    ConnectionDoesNotExist,
}

/// Registry mapping port names to live connections.
///
/// All operations take effect synchronously under one lock acquisition.
///
/// # Example
/// ```no_run
/// use serial_link::{ConnectionInfo, ConnectionPool};
///
/// let pool = ConnectionPool::new();
/// let info = ConnectionInfo::new("/dev/ttyUSB0", 115_200);
/// let connection = pool.create_connection(&info)?;
/// assert!(pool.contains_connection("/dev/ttyUSB0"));
/// # Ok::<(), serial_link::PoolError>(())
/// ```
pub struct ConnectionPool {
    factory: Arc<dyn ConnectionFactory>,
    connections: Mutex<HashMap<String, Arc<SerialConnection>>>,
}

impl ConnectionPool {
    /// Pool backed by the [`SystemConnectionFactory`].
    pub fn new() -> Self {
        Self::with_factory(Arc::new(SystemConnectionFactory))
    }

    /// Pool backed by a caller-supplied factory.
    pub fn with_factory(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            factory,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide shared pool.
    ///
    /// Initialized lazily on first access and never reset. Tests must not
    /// rely on cross-test isolation of this instance; prefer private pools
    /// constructed with [`ConnectionPool::new`].
    pub fn local() -> &'static ConnectionPool {
        &LOCAL_POOL
    }

    /// Create a connection via the factory and register it.
    ///
    /// Fails with [`PoolError::ConnectionAlreadyExists`] without touching
    /// the registry when the port name is taken, and with
    /// [`PoolError::FailedToCreateConnection`] when the factory fails.
    pub fn create_connection(
        &self,
        info: &ConnectionInfo,
    ) -> Result<Arc<SerialConnection>, PoolError> {
        let mut connections = self.connections.lock();
        if connections.contains_key(&info.port_name) {
            return Err(PoolError::ConnectionAlreadyExists(info.port_name.clone()));
        }

        let connection = self.factory.create_connection(info).map_err(|e| {
            warn!(port = %info.port_name, error = %e, "connection factory failed");
            PoolError::FailedToCreateConnection(e)
        })?;

        connections.insert(info.port_name.clone(), Arc::clone(&connection));
        debug!(port = %info.port_name, "connection registered");
        Ok(connection)
    }

    /// Register a caller-constructed connection under its own port name.
    pub fn add_connection(&self, connection: Arc<SerialConnection>) -> Result<(), PoolError> {
        let mut connections = self.connections.lock();
        let port_name = connection.connection_info().port_name.clone();
        if connections.contains_key(&port_name) {
            return Err(PoolError::ConnectionAlreadyExists(port_name));
        }
        debug!(port = %port_name, "connection registered");
        connections.insert(port_name, connection);
        Ok(())
    }

    /// Look a connection up by port name.
    pub fn get_connection(&self, port_name: &str) -> Result<Arc<SerialConnection>, PoolError> {
        self.connections
            .lock()
            .get(port_name)
            .cloned()
            .ok_or(PoolError::ConnectionDoesNotExist)
    }

    /// Look a connection up by full descriptor.
    ///
    /// Resolves by port name, then requires the stored connection's info to
    /// equal `info` on every field. A connection registered under the same
    /// port name with a different configuration is invisible to this
    /// lookup.
    pub fn get_connection_matching(
        &self,
        info: &ConnectionInfo,
    ) -> Result<Arc<SerialConnection>, PoolError> {
        let connections = self.connections.lock();
        match connections.get(&info.port_name) {
            Some(connection) if connection.connection_info() == info => {
                Ok(Arc::clone(connection))
            }
            _ => Err(PoolError::ConnectionDoesNotExist),
        }
    }

    /// Whether a connection is registered under `port_name`.
    pub fn contains_connection(&self, port_name: &str) -> bool {
        self.connections.lock().contains_key(port_name)
    }

    /// Whether a connection matching the full descriptor is registered.
    pub fn contains_connection_matching(&self, info: &ConnectionInfo) -> bool {
        self.get_connection_matching(info).is_ok()
    }

    /// Whether this exact connection instance is registered.
    pub fn contains_instance(&self, connection: &Arc<SerialConnection>) -> bool {
        self.connections
            .lock()
            .values()
            .any(|registered| Arc::ptr_eq(registered, connection))
    }

    /// Remove the connection registered under `port_name`, if any.
    pub fn remove_connection(&self, port_name: &str) {
        if self.connections.lock().remove(port_name).is_some() {
            debug!(port = %port_name, "connection removed");
        }
    }

    /// Remove the connection matching the full descriptor, if any.
    pub fn remove_connection_matching(&self, info: &ConnectionInfo) {
        let mut connections = self.connections.lock();
        let matches = connections
            .get(&info.port_name)
            .is_some_and(|connection| connection.connection_info() == info);
        if matches {
            connections.remove(&info.port_name);
            debug!(port = %info.port_name, "connection removed");
        }
    }

    /// Remove this exact connection instance, if registered.
    pub fn remove_instance(&self, connection: &Arc<SerialConnection>) {
        let mut connections = self.connections.lock();
        let key = connections
            .iter()
            .find(|(_, registered)| Arc::ptr_eq(registered, connection))
            .map(|(port_name, _)| port_name.clone());
        if let Some(port_name) = key {
            connections.remove(&port_name);
            debug!(port = %port_name, "connection removed");
        }
    }

    /// Snapshot of every registered connection.
    pub fn connections(&self) -> Vec<Arc<SerialConnection>> {
        self.connections.lock().values().cloned().collect()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("connections", &self.len())
            .finish()
    }
}
