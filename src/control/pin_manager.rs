//! Timed enable/disable/toggle state machine for one control pin.

use super::{ControlPin, PinState};
use crate::constants::MINIMUM_SIGNAL_SWITCH_TIME;
use crate::delay::Delay;
use crate::transport::{PortError, SerialTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Capability contract for driving a single control pin.
///
/// All timed operations suspend the calling task for the hold duration;
/// none block indefinitely. Once a timed hold has started it runs to
/// completion; there is no cancellation path. If the surrounding task is
/// aborted mid-hold the pin is left in the held value and the caller must
/// resynchronize it explicitly.
#[async_trait]
pub trait ControlPinManager: Send + Sync {
    /// Enable the pin indefinitely.
    async fn enable_pin(&self) -> Result<(), PortError>;

    /// Enable the pin for at least
    /// [`MINIMUM_SIGNAL_SWITCH_TIME`], then disable it.
    async fn enable_pin_for(&self, duration: Duration) -> Result<(), PortError>;

    /// Disable the pin indefinitely.
    async fn disable_pin(&self) -> Result<(), PortError>;

    /// Disable the pin for at least
    /// [`MINIMUM_SIGNAL_SWITCH_TIME`], then enable it.
    async fn disable_pin_for(&self, duration: Duration) -> Result<(), PortError>;

    /// Flip the pin's current value with no hold.
    async fn toggle_pin(&self) -> Result<(), PortError>;

    /// Flip the pin's current value, hold the flipped value for at least
    /// [`MINIMUM_SIGNAL_SWITCH_TIME`], then flip back.
    ///
    /// The pin always ends in its pre-call state.
    async fn toggle_pin_for(&self, duration: Duration) -> Result<(), PortError>;

    /// The pin this manager drives.
    fn pin(&self) -> ControlPin;

    /// State written by the last completed flag write.
    fn state(&self) -> PinState;
}

/// Capability contract for pulsing a signal on a managed pin.
///
/// A signal is a transient toggle: the pin visits the opposite value for
/// the hold window and reverts.
#[async_trait]
pub trait PinSignalSender: Send + Sync {
    /// Send a short signal (minimum hold duration) on the managed pin.
    async fn send_signal(&self) -> Result<(), PortError>;

    /// Send a signal held for at least the clamped `duration`.
    async fn send_signal_for(&self, duration: Duration) -> Result<(), PortError>;
}

/// Drives one DTR or RTS enable flag on a shared transport.
///
/// Created once per (pin, transport) pair when a connection is constructed
/// and lives as long as the connection. The transport is shared: the
/// connection owns it, and this manager only manipulates its one flag.
pub struct SerialControlPinManager {
    pin: ControlPin,
    transport: Arc<dyn SerialTransport>,
    delay: Arc<dyn Delay>,
    state: Mutex<PinState>,
}

impl SerialControlPinManager {
    /// Create a manager for `pin` on `transport`, pausing via `delay`.
    pub fn new(
        pin: ControlPin,
        transport: Arc<dyn SerialTransport>,
        delay: Arc<dyn Delay>,
    ) -> Self {
        Self {
            pin,
            transport,
            delay,
            state: Mutex::new(PinState::Disabled),
        }
    }

    async fn write_flag(&self, enabled: bool) -> Result<(), PortError> {
        match self.pin {
            ControlPin::Dtr => self.transport.set_dtr(enabled).await,
            ControlPin::Rts => self.transport.set_rts(enabled).await,
        }
    }

    fn flag(&self) -> bool {
        match self.pin {
            ControlPin::Dtr => self.transport.dtr(),
            ControlPin::Rts => self.transport.rts(),
        }
    }

    fn set_state(&self, state: PinState) {
        *self.state.lock() = state;
    }

    fn toggle_state(&self) {
        let mut state = self.state.lock();
        *state = state.toggled();
    }
}

/// Clamp a requested hold duration up to the minimum signal switch time.
fn hold_duration(duration: Duration) -> Duration {
    duration.max(MINIMUM_SIGNAL_SWITCH_TIME)
}

#[async_trait]
impl ControlPinManager for SerialControlPinManager {
    async fn enable_pin(&self) -> Result<(), PortError> {
        self.write_flag(true).await?;
        self.set_state(PinState::Enabled);
        Ok(())
    }

    async fn enable_pin_for(&self, duration: Duration) -> Result<(), PortError> {
        self.write_flag(true).await?;
        self.set_state(PinState::Enabled);
        self.delay.delay(hold_duration(duration)).await;
        self.write_flag(false).await?;
        self.set_state(PinState::Disabled);
        Ok(())
    }

    async fn disable_pin(&self) -> Result<(), PortError> {
        self.write_flag(false).await?;
        self.set_state(PinState::Disabled);
        Ok(())
    }

    async fn disable_pin_for(&self, duration: Duration) -> Result<(), PortError> {
        self.write_flag(false).await?;
        self.set_state(PinState::Disabled);
        self.delay.delay(hold_duration(duration)).await;
        self.write_flag(true).await?;
        self.set_state(PinState::Enabled);
        Ok(())
    }

    async fn toggle_pin(&self) -> Result<(), PortError> {
        self.write_flag(!self.flag()).await?;
        self.toggle_state();
        Ok(())
    }

    async fn toggle_pin_for(&self, duration: Duration) -> Result<(), PortError> {
        self.write_flag(!self.flag()).await?;
        self.toggle_state();
        self.delay.delay(hold_duration(duration)).await;
        self.write_flag(!self.flag()).await?;
        self.toggle_state();
        Ok(())
    }

    fn pin(&self) -> ControlPin {
        self.pin
    }

    fn state(&self) -> PinState {
        *self.state.lock()
    }
}

#[async_trait]
impl PinSignalSender for SerialControlPinManager {
    async fn send_signal(&self) -> Result<(), PortError> {
        self.send_signal_for(Duration::ZERO).await
    }

    async fn send_signal_for(&self, duration: Duration) -> Result<(), PortError> {
        self.toggle_pin_for(duration).await
    }
}

impl std::fmt::Debug for SerialControlPinManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialControlPinManager")
            .field("pin", &self.pin)
            .field("state", &self.state())
            .finish()
    }
}
