//! Telemetry publishing.
//!
//! Maps the resolved device identity and incoming probe readings to the
//! messages the automation hub expects: one retained config document per
//! session, then non-retained per-probe state messages.

use tracing::debug;

use crate::error::Result;
use crate::identity::DeviceIdentity;
use crate::mqtt::payload::{self, DeviceConfig};
use crate::mqtt::topics::DeviceId;
use crate::mqtt::MessageTransport;
use crate::reading::ProbeReading;

/// Publishes gateway telemetry through a message transport.
pub struct TelemetryPublisher<T> {
    transport: T,
    device_id: DeviceId,
    client_name: String,
}

impl<T: MessageTransport> TelemetryPublisher<T> {
    /// Create a publisher for the given device.
    pub fn new(transport: T, device_id: DeviceId, client_name: String) -> Self {
        Self {
            transport,
            device_id,
            client_name,
        }
    }

    /// The device identifier this publisher announces under.
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Publish the retained config document announcing the device and its
    /// four probe sensors.
    ///
    /// Must be called once per session, before any state message, and again
    /// after every reconnect: the hub does not persist the config across
    /// broker restarts without it.
    pub async fn publish_device_config(
        &self,
        identity: &DeviceIdentity,
        fallback_name: &str,
    ) -> Result<()> {
        let config = DeviceConfig::new(
            &self.device_id,
            identity.name_or(fallback_name),
            &self.client_name,
        );
        let payload = serde_json::to_vec(&config)?;
        let topic = self.device_id.config_topic();

        debug!("Publishing device config to {}", topic);
        self.transport.publish(&topic, payload, true).await
    }

    /// Publish one non-retained state message for a probe reading.
    ///
    /// The value is forwarded as received from the decode step.
    pub async fn publish_probe_value(&self, reading: &ProbeReading) -> Result<()> {
        let payload = payload::probe_state_json(&reading.value)?;
        let topic = self.device_id.probe_state_topic(reading.probe);

        debug!("Publishing probe {} value to {}", reading.probe, topic);
        self.transport.publish(&topic, payload, false).await
    }
}
