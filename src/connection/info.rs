//! Declarative serial connection parameters.

use crate::transport::{DataBits, FlowControl, Parity, StopBits};
use serde::{Deserialize, Serialize};

/// The information needed to create a serial connection.
///
/// Equality is structural over every field, including unset optionals:
/// two infos are equal iff all six fields match. The pool and lookup rely
/// on this for full-descriptor resolution.
///
/// An info is immutable once built; components copy it rather than mutate
/// it in place.
///
/// # Example
/// ```
/// use serial_link::{ConnectionInfo, Parity};
///
/// let info = ConnectionInfo::new("/dev/ttyUSB0", 115_200).with_parity(Parity::Even);
/// assert_eq!(info.baud_rate, 115_200);
/// assert_eq!(info.parity, Some(Parity::Even));
/// assert_eq!(info.data_bits, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// The name of the port to connect to.
    pub port_name: String,
    /// The baud rate (speed) of the connection.
    pub baud_rate: u32,
    /// The number of data bits in each byte, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_bits: Option<DataBits>,
    /// The number of stop bits in each byte, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_bits: Option<StopBits>,
    /// The parity configuration, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parity: Option<Parity>,
    /// The flow-control (handshake) configuration, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_control: Option<FlowControl>,
}

impl ConnectionInfo {
    /// Create an info with the required fields; framing options stay unset.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            data_bits: None,
            stop_bits: None,
            parity: None,
            flow_control: None,
        }
    }

    /// Copy of this info bound to a different port name.
    ///
    /// Used by port lookup to re-target one connection shape at each
    /// candidate port.
    pub fn with_port_name(&self, port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..self.clone()
        }
    }

    /// Builder-style data bits setter.
    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = Some(data_bits);
        self
    }

    /// Builder-style stop bits setter.
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = Some(stop_bits);
        self
    }

    /// Builder-style parity setter.
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = Some(parity);
        self
    }

    /// Builder-style flow-control setter.
    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = Some(flow_control);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn equality_is_structural_over_all_fields() {
        let a = ConnectionInfo::new("COM3", 9600).with_parity(Parity::Odd);
        let b = ConnectionInfo::new("COM3", 9600).with_parity(Parity::Odd);
        assert_eq!(a, b);
    }

    #[test]
    fn unset_optionals_match_each_other() {
        let a = ConnectionInfo::new("COM3", 9600);
        let b = ConnectionInfo::new("COM3", 9600);
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_data_bits(DataBits::Eight));
    }

    #[test]
    fn differing_baud_rates_are_unequal() {
        let a = ConnectionInfo::new("COM3", 9600);
        let b = ConnectionInfo::new("COM3", 115_200);
        assert_ne!(a, b);
    }

    #[test]
    fn with_port_name_substitutes_only_the_port() {
        let base = ConnectionInfo::new("ignored", 57_600).with_stop_bits(StopBits::Two);
        let bound = base.with_port_name("/dev/ttyACM1");

        assert_eq!(bound.port_name, "/dev/ttyACM1");
        assert_eq!(bound.baud_rate, 57_600);
        assert_eq!(bound.stop_bits, Some(StopBits::Two));
    }

    #[test]
    fn serde_round_trip_preserves_unset_fields() {
        let info = ConnectionInfo::new("/dev/ttyUSB0", 19_200).with_flow_control(FlowControl::Hardware);
        let toml = toml::to_string(&info).unwrap();
        let back: ConnectionInfo = toml::from_str(&toml).unwrap();
        assert_eq!(info, back);
    }
}
