//! Topic naming for the Home Assistant discovery convention.
//!
//! The naming law reproduced here is what the hub side expects:
//! config topic `homeassistant/device/<deviceID>/config`, probe state topic
//! `fm100/<deviceID>/probe<NN>/state`, sensor unique id `<deviceID><NN>`.

use std::fmt;

use crate::reading::ProbeIndex;

/// Device identifier derived from the peripheral's hardware address:
/// `0x` followed by the MAC with colons stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId(String);

impl DeviceId {
    /// Derive the identifier from a MAC string such as `AA:BB:CC:DD:EE:FF`.
    pub fn from_mac(mac: &str) -> Self {
        Self(format!("0x{}", mac.replace(':', "")))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Retained device config topic.
    pub fn config_topic(&self) -> String {
        format!("homeassistant/device/{}/config", self.0)
    }

    /// Per-probe state topic.
    pub fn probe_state_topic(&self, probe: ProbeIndex) -> String {
        format!("fm100/{}/probe{}/state", self.0, probe.two_digit())
    }

    /// Unique id of a probe sensor.
    pub fn probe_unique_id(&self, probe: ProbeIndex) -> String {
        format!("{}{}", self.0, probe.two_digit())
    }

    /// Key of a probe's component entry in the discovery document.
    pub fn component_key(&self, probe: ProbeIndex) -> String {
        format!("{}_{}", self.0, probe_name(probe))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display name of a probe sensor, `probe-<NN>`.
pub fn probe_name(probe: ProbeIndex) -> String {
    format!("probe-{}", probe.two_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn probe(index: u8) -> ProbeIndex {
        ProbeIndex::new(index).unwrap()
    }

    #[test]
    fn test_device_id_from_mac() {
        let id = DeviceId::from_mac("54:4E:94:C0:9B:C8");
        assert_eq!(id.as_str(), "0x544E94C09BC8");
    }

    #[test]
    fn test_config_topic() {
        let id = DeviceId::from_mac("AA:BB:CC:DD:EE:FF");
        assert_eq!(
            id.config_topic(),
            "homeassistant/device/0xAABBCCDDEEFF/config"
        );
    }

    #[test]
    fn test_probe_state_topics() {
        let id = DeviceId::from_mac("AA:BB:CC:DD:EE:FF");
        for index in 1..=4 {
            assert_eq!(
                id.probe_state_topic(probe(index)),
                format!("fm100/0xAABBCCDDEEFF/probe0{}/state", index)
            );
        }
    }

    #[test]
    fn test_probe_unique_id() {
        let id = DeviceId::from_mac("AA:BB:CC:DD:EE:FF");
        assert_eq!(id.probe_unique_id(probe(2)), "0xAABBCCDDEEFF02");
    }

    #[test]
    fn test_component_key() {
        let id = DeviceId::from_mac("54:4E:94:C0:9B:C8");
        assert_eq!(id.component_key(probe(1)), "0x544E94C09BC8_probe-01");
    }

    #[test]
    fn test_probe_three_renders_identically_on_both_paths() {
        // The zero-padded two-digit convention must agree between the config
        // path (unique id, component key) and the state path (topic).
        let id = DeviceId::from_mac("AA:BB:CC:DD:EE:FF");
        let three = probe(3);

        assert!(id.probe_unique_id(three).ends_with("03"));
        assert!(id.component_key(three).ends_with("probe-03"));
        assert_eq!(
            id.probe_state_topic(three),
            "fm100/0xAABBCCDDEEFF/probe03/state"
        );
    }
}
