//! MQTT transport and telemetry publishing.
//!
//! The [`MessageTransport`] trait is the boundary to the broker: topic,
//! payload, retained flag, fire-and-forget at QoS 0. [`MqttTransport`]
//! implements it over rumqttc.

pub mod payload;
pub mod publisher;
pub mod topics;

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use tracing::{debug, trace, warn};

use crate::config::MqttSettings;
use crate::error::Result;

pub use publisher::TelemetryPublisher;
pub use topics::DeviceId;

/// Message transport toward the automation hub's broker.
///
/// No acknowledgment tracking: publishes are fire-and-forget at the lowest
/// quality-of-service level.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Publish a message.
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()>;
}

/// rumqttc-backed transport.
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    /// Connect to the broker and spawn the connection event loop.
    ///
    /// The returned task keeps the connection alive (and reconnecting) for
    /// the life of the gateway.
    pub fn connect(settings: &MqttSettings) -> (Self, tokio::task::JoinHandle<()>) {
        let mut options =
            MqttOptions::new(settings.client_name.clone(), settings.host.clone(), settings.port);
        options.set_keep_alive(Duration::from_secs(30));

        if let Some(username) = &settings.username {
            options.set_credentials(
                username.clone(),
                settings.password.clone().unwrap_or_default(),
            );
        }

        let (client, mut event_loop) = AsyncClient::new(options, 16);

        let handle = tokio::spawn(async move {
            debug!("MQTT event loop starting");
            loop {
                match event_loop.poll().await {
                    Ok(event) => trace!("MQTT event: {:?}", event),
                    Err(e) => {
                        warn!("MQTT connection error: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        (Self { client }, handle)
    }
}

#[async_trait]
impl MessageTransport for MqttTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, retain, payload)
            .await?;
        Ok(())
    }
}
