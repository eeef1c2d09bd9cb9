//! Gateway configuration.
//!
//! Configuration is supplied externally as a YAML file: the target probe's
//! hardware address and the MQTT broker coordinates. Wi-Fi credentials and
//! other host-level concerns are outside the gateway's scope.

use std::path::Path;
use std::str::FromStr;

use btleplug::api::BDAddr;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default MQTT client name announced to the broker.
pub const DEFAULT_CLIENT_NAME: &str = "fm100-gateway";

/// Device name used until the real one is read over BLE.
pub const DEFAULT_DEVICE_NAME: &str = "FM100B";

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

/// Target probe device settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSettings {
    /// Hardware address of the probe, e.g. `AA:BB:CC:DD:EE:FF`.
    pub mac: String,

    /// Fallback display name, replaced by the name read from the
    /// generic-access service once connected.
    #[serde(default = "default_device_name")]
    pub name: String,
}

/// MQTT broker settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MqttSettings {
    /// Broker hostname or IP address.
    pub host: String,

    /// Broker port.
    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Optional broker username.
    #[serde(default)]
    pub username: Option<String>,

    /// Optional broker password.
    #[serde(default)]
    pub password: Option<String>,

    /// Client name announced to the broker and in discovery payloads.
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

/// Full gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// The probe to bridge.
    pub device: DeviceSettings,

    /// The broker to publish to.
    pub mqtt: MqttSettings,
}

impl GatewayConfig {
    /// Load the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse the configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Parse the configured MAC into a BLE peripheral address.
    pub fn peripheral_address(&self) -> Result<BDAddr> {
        BDAddr::from_str(&self.device.mac).map_err(|_| Error::InvalidAddress {
            address: self.device.mac.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_config() {
        let config = GatewayConfig::parse(
            r#"
device:
  mac: "AA:BB:CC:DD:EE:FF"
mqtt:
  host: "broker.local"
"#,
        )
        .unwrap();

        assert_eq!(config.device.mac, "AA:BB:CC:DD:EE:FF");
        assert_eq!(config.device.name, "FM100B");
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.username, None);
        assert_eq!(config.mqtt.client_name, "fm100-gateway");
    }

    #[test]
    fn test_parse_full_config() {
        let config = GatewayConfig::parse(
            r#"
device:
  mac: "54:4E:94:C0:9B:C8"
  name: "FM100B-kitchen"
mqtt:
  host: "10.0.0.2"
  port: 8883
  username: "gateway"
  password: "secret"
  client_name: "fm100-kitchen"
"#,
        )
        .unwrap();

        assert_eq!(config.device.name, "FM100B-kitchen");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.username.as_deref(), Some("gateway"));
        assert_eq!(config.mqtt.client_name, "fm100-kitchen");
    }

    #[test]
    fn test_peripheral_address() {
        let config = GatewayConfig::parse(
            "device:\n  mac: \"AA:BB:CC:DD:EE:FF\"\nmqtt:\n  host: \"broker\"\n",
        )
        .unwrap();

        let address = config.peripheral_address().unwrap();
        assert_eq!(address.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_invalid_peripheral_address() {
        let config =
            GatewayConfig::parse("device:\n  mac: \"not-a-mac\"\nmqtt:\n  host: \"broker\"\n")
                .unwrap();

        let err = config.peripheral_address().unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { .. }));
    }
}
