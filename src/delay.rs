//! Delay capability used by timed pin operations.
//!
//! Pin managers never call `tokio::time::sleep` directly; they go through
//! the [`Delay`] trait so tests can substitute an instrumented stub and
//! assert on the requested durations instead of waiting them out.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// An awaitable pause.
#[async_trait]
pub trait Delay: Send + Sync {
    /// Suspend the calling task for `duration`.
    async fn delay(&self, duration: Duration);
}

/// Production [`Delay`] backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test [`Delay`] that records every requested duration and returns
/// immediately.
///
/// Clones share the same recording.
///
/// # Example
/// ```
/// use serial_link::delay::{Delay, RecordingDelay};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let delay = RecordingDelay::default();
/// delay.delay(Duration::from_millis(250)).await;
/// assert_eq!(delay.recorded(), vec![Duration::from_millis(250)]);
/// # });
/// ```
#[derive(Debug, Default, Clone)]
pub struct RecordingDelay {
    recorded: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    /// All durations requested so far, in call order.
    pub fn recorded(&self) -> Vec<Duration> {
        self.recorded.lock().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn delay(&self, duration: Duration) {
        self.recorded.lock().push(duration);
    }
}
