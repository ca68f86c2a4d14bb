//! Control-pin identities, states, and the timed pin state machine.
//!
//! RS-232 exposes two host-driven control lines, DTR and RTS. This module
//! models each line as a [`ControlPin`] managed by a
//! [`SerialControlPinManager`], which drives the transport's enable flag
//! through enable/disable/toggle transitions with a minimum hold duration
//! for timed operations.

pub mod pin_manager;

pub use pin_manager::{ControlPinManager, PinSignalSender, SerialControlPinManager};

use serde::{Deserialize, Serialize};

/// A host-driven RS-232 control line.
///
/// The set is closed: every pin maps to exactly one enable flag on the
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPin {
    /// Data Terminal Ready.
    Dtr,
    /// Request To Send.
    Rts,
}

impl std::fmt::Display for ControlPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dtr => write!(f, "DTR"),
            Self::Rts => write!(f, "RTS"),
        }
    }
}

/// Observable state of a managed control pin.
///
/// The state always reflects the last completed write to the pin's enable
/// flag; during a timed hold it reflects the held value until the hold
/// completes and the pin reverts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinState {
    /// The pin is disabled.
    #[default]
    Disabled,
    /// The pin is enabled.
    Enabled,
}

impl PinState {
    /// Whether the pin is enabled.
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }

    /// Whether the pin is disabled.
    pub fn is_disabled(self) -> bool {
        self == Self::Disabled
    }

    /// The opposite state.
    pub fn toggled(self) -> Self {
        match self {
            Self::Enabled => Self::Disabled,
            Self::Disabled => Self::Enabled,
        }
    }

    /// `Enabled` for `true`, `Disabled` for `false`.
    pub fn from_bool(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    /// `true` when enabled.
    pub fn as_bool(self) -> bool {
        self.is_enabled()
    }
}
