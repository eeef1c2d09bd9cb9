//! Structured payload models for the discovery convention.
//!
//! The documents are assembled as data and serialized with serde, keeping the
//! wire-format contract separate from publisher state and avoiding the
//! escaping bugs of string-templated JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{Error, Result};
use crate::mqtt::topics::{probe_name, DeviceId};
use crate::reading::ProbeIndex;

/// The `dev` block: the bridged device itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceBlock {
    /// Device identifier.
    pub ids: String,
    /// Device display name.
    pub name: String,
}

/// The `o` block: the originating client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OriginBlock {
    /// Name of the publishing client.
    pub name: String,
}

/// One probe sensor entry under `cmps`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SensorComponent {
    /// Sensor display name.
    pub name: String,
    /// Component platform, always `sensor`.
    pub p: String,
    /// Measurement class, always `temperature`.
    pub device_class: String,
    /// Unit, always `°C`.
    pub unit_of_measurement: String,
    /// Unique id of the sensor.
    pub unique_id: String,
    /// Template extracting the value from state payloads.
    pub value_template: String,
    /// State class, always `measurement`.
    pub state_class: String,
    /// Topic the sensor's state messages arrive on.
    pub state_topic: String,
}

/// The retained device config document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// The bridged device.
    pub dev: DeviceBlock,
    /// The originating client.
    pub o: OriginBlock,
    /// Sensor components keyed by `<deviceID>_<probe-name>`.
    pub cmps: BTreeMap<String, SensorComponent>,
}

impl DeviceConfig {
    /// Build the config document announcing the device and its four probes.
    pub fn new(device_id: &DeviceId, device_name: &str, client_name: &str) -> Self {
        let cmps = ProbeIndex::all()
            .map(|probe| {
                (
                    device_id.component_key(probe),
                    SensorComponent {
                        name: probe_name(probe),
                        p: "sensor".to_string(),
                        device_class: "temperature".to_string(),
                        unit_of_measurement: "°C".to_string(),
                        unique_id: device_id.probe_unique_id(probe),
                        value_template: "{{ value_json.temperature}}".to_string(),
                        state_class: "measurement".to_string(),
                        state_topic: device_id.probe_state_topic(probe),
                    },
                )
            })
            .collect();

        Self {
            dev: DeviceBlock {
                ids: device_id.as_str().to_string(),
                name: device_name.to_string(),
            },
            o: OriginBlock {
                name: client_name.to_string(),
            },
            cmps,
        }
    }
}

/// The per-probe state document, `{"temperature":<value>}`.
#[derive(Debug, Serialize)]
pub struct ProbeState<'a> {
    /// The decoded value, forwarded verbatim as a raw JSON token.
    pub temperature: &'a RawValue,
}

/// Serialize a probe state payload with the value injected as received.
pub fn probe_state_json(value: &str) -> Result<Vec<u8>> {
    let raw = RawValue::from_string(value.to_string()).map_err(|_| Error::Decode {
        context: format!("probe value {:?} is not a valid JSON token", value),
    })?;

    Ok(serde_json::to_vec(&ProbeState { temperature: &raw })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_probe_state_json_exact_bytes() {
        let payload = probe_state_json("23.4").unwrap();
        assert_eq!(payload, b"{\"temperature\":23.4}");
    }

    #[test]
    fn test_probe_state_json_preserves_rendering() {
        // The value is not re-parsed as a number, so trailing zeroes survive.
        let payload = probe_state_json("21.50").unwrap();
        assert_eq!(payload, b"{\"temperature\":21.50}");
    }

    #[test]
    fn test_probe_state_json_rejects_non_token() {
        let err = probe_state_json("not a value").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_device_config_has_four_components() {
        let id = DeviceId::from_mac("AA:BB:CC:DD:EE:FF");
        let config = DeviceConfig::new(&id, "FM100B", "fm100-gateway");

        assert_eq!(config.cmps.len(), 4);
        for (index, (key, component)) in config.cmps.iter().enumerate() {
            let probe = ProbeIndex::new(index as u8 + 1).unwrap();
            assert!(key.ends_with(&format!("probe-0{}", index + 1)));
            assert_eq!(component.p, "sensor");
            assert_eq!(component.device_class, "temperature");
            assert_eq!(component.unit_of_measurement, "°C");
            assert_eq!(component.state_class, "measurement");
            assert_eq!(component.value_template, "{{ value_json.temperature}}");
            assert_eq!(component.state_topic, id.probe_state_topic(probe));
            assert_eq!(component.unique_id, id.probe_unique_id(probe));
        }
    }

    #[test]
    fn test_device_config_round_trips_through_json() {
        let id = DeviceId::from_mac("54:4E:94:C0:9B:C8");
        let config = DeviceConfig::new(&id, "FM100B", "fm100-gateway");

        let bytes = serde_json::to_vec(&config).unwrap();
        let parsed: DeviceConfig = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed, config);
        assert_eq!(parsed.dev.ids, "0x544E94C09BC8");
        assert_eq!(parsed.o.name, "fm100-gateway");
    }
}
