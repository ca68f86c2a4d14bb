//! Timing and configuration constants shared across the crate.

use std::time::Duration;

/// Minimum duration a control-pin transition is held before reverting.
///
/// Many devices sample their control lines slowly; a pulse shorter than
/// this floor may never be observed on the far end. Every timed pin
/// operation clamps its requested duration up to this value.
pub const MINIMUM_SIGNAL_SWITCH_TIME: Duration = Duration::from_millis(200);

/// Default baud rate used when a connection profile leaves it unset (9600 bps).
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Size of the chunk buffer used by the system transport's reader task.
pub(crate) const READ_CHUNK_SIZE: usize = 4096;

/// Capacity of the transport event broadcast channel.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 32;
