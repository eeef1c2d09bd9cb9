//! GATT client operations against the connected peripheral.
//!
//! The [`GattClient`] trait is the seam between the discovery script and the
//! radio: service/characteristic discovery by UUID, MTU-bounded value reads
//! and notification subscription. [`BleGattClient`] implements it on top of a
//! connected btleplug peripheral; tests mock the trait instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Read size used when the link MTU is not known.
const DEFAULT_MTU: usize = 64;

/// A resolved GATT service, identified by UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    uuid: Uuid,
}

impl ServiceHandle {
    /// Create a handle for a resolved service.
    pub fn new(uuid: Uuid) -> Self {
        Self { uuid }
    }

    /// UUID of the resolved service.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

/// A characteristic returned by discovery.
///
/// Carries only identity; the underlying radio handle stays cached inside the
/// client and is invalidated when the client is dropped on disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCharacteristic {
    /// UUID of the characteristic.
    pub uuid: Uuid,
    /// UUID of the service it was discovered under.
    pub service_uuid: Uuid,
}

/// Notification event from a subscribed characteristic.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    /// UUID of the characteristic that sent the notification.
    pub characteristic_uuid: Uuid,
    /// The notification data.
    pub data: Vec<u8>,
}

/// GATT operations against the currently connected peripheral.
///
/// All operations perform radio transactions and may fail on link loss; no
/// retries happen internally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GattClient: Send + Sync {
    /// Resolve a service by UUID.
    ///
    /// Returns [`Error::ServiceNotFound`] if the peripheral advertises no
    /// matching service.
    async fn discover_service(&self, service_uuid: Uuid) -> Result<ServiceHandle>;

    /// Request a set of characteristics within a resolved service in a single
    /// round trip.
    ///
    /// The peripheral may return fewer characteristics than requested; callers
    /// must match results by UUID, never by position or count.
    async fn discover_characteristics(
        &self,
        service: &ServiceHandle,
        uuids: Vec<Uuid>,
    ) -> Result<Vec<DiscoveredCharacteristic>>;

    /// Read a characteristic value, bounded by the link MTU (or a 64-byte
    /// default when the MTU is not known).
    async fn read_value(&self, characteristic: &DiscoveredCharacteristic) -> Result<Vec<u8>>;

    /// Enable notifications on a characteristic.
    ///
    /// Frames are delivered through [`GattClient::notifications`] in radio
    /// arrival order.
    async fn subscribe_notify(&self, characteristic: &DiscoveredCharacteristic) -> Result<()>;

    /// Receiver for notification events from all subscribed characteristics.
    fn notifications(&self) -> broadcast::Receiver<NotificationEvent>;
}

/// [`GattClient`] implementation over a connected btleplug peripheral.
pub struct BleGattClient {
    /// The connected peripheral.
    peripheral: Peripheral,
    /// Cached characteristics by UUID, valid for the life of the connection.
    characteristics: Arc<RwLock<HashMap<Uuid, Characteristic>>>,
    /// Channel for notification events.
    notification_tx: broadcast::Sender<NotificationEvent>,
    /// Handle to the notification forwarding task.
    listener_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl BleGattClient {
    /// Create a client for a freshly connected peripheral.
    pub fn new(peripheral: Peripheral) -> Self {
        let (notification_tx, _) = broadcast::channel(256);

        Self {
            peripheral,
            characteristics: Arc::new(RwLock::new(HashMap::new())),
            notification_tx,
            listener_handle: RwLock::new(None),
        }
    }

    fn cached_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        self.characteristics
            .read()
            .get(&uuid)
            .cloned()
            .ok_or(Error::CharacteristicNotFound { uuid })
    }

    /// Start the task forwarding the peripheral's notification stream into
    /// the broadcast channel, if not already running.
    async fn ensure_listener(&self) -> Result<()> {
        if self.listener_handle.read().is_some() {
            return Ok(());
        }

        let mut stream = self
            .peripheral
            .notifications()
            .await
            .map_err(Error::Bluetooth)?;
        let notification_tx = self.notification_tx.clone();

        let handle = tokio::spawn(async move {
            debug!("Notification forwarding task starting");

            while let Some(notification) = stream.next().await {
                trace!(
                    "Notification from {}: {} bytes",
                    notification.uuid,
                    notification.value.len()
                );

                let _ = notification_tx.send(NotificationEvent {
                    characteristic_uuid: notification.uuid,
                    data: notification.value,
                });
            }

            debug!("Notification stream ended");
        });

        let mut guard = self.listener_handle.write();
        if guard.is_some() {
            // Lost the race against another subscriber.
            handle.abort();
        } else {
            *guard = Some(handle);
        }

        Ok(())
    }
}

#[async_trait]
impl GattClient for BleGattClient {
    async fn discover_service(&self, service_uuid: Uuid) -> Result<ServiceHandle> {
        self.peripheral
            .discover_services()
            .await
            .map_err(Error::Bluetooth)?;

        let found = self
            .peripheral
            .services()
            .iter()
            .any(|service| service.uuid == service_uuid);

        if !found {
            return Err(Error::ServiceNotFound { uuid: service_uuid });
        }

        debug!("Resolved service {}", service_uuid);
        Ok(ServiceHandle::new(service_uuid))
    }

    async fn discover_characteristics(
        &self,
        service: &ServiceHandle,
        uuids: Vec<Uuid>,
    ) -> Result<Vec<DiscoveredCharacteristic>> {
        let services = self.peripheral.services();
        let resolved = services
            .iter()
            .find(|candidate| candidate.uuid == service.uuid())
            .ok_or(Error::ServiceNotFound {
                uuid: service.uuid(),
            })?;

        let mut discovered = Vec::new();
        let mut cache = self.characteristics.write();

        for characteristic in &resolved.characteristics {
            if !uuids.contains(&characteristic.uuid) {
                continue;
            }

            cache.insert(characteristic.uuid, characteristic.clone());
            discovered.push(DiscoveredCharacteristic {
                uuid: characteristic.uuid,
                service_uuid: resolved.uuid,
            });
        }

        debug!(
            "Discovered {} of {} requested characteristics in {}",
            discovered.len(),
            uuids.len(),
            service.uuid()
        );

        Ok(discovered)
    }

    async fn read_value(&self, characteristic: &DiscoveredCharacteristic) -> Result<Vec<u8>> {
        let inner = self.cached_characteristic(characteristic.uuid)?;

        let mut data = self
            .peripheral
            .read(&inner)
            .await
            .map_err(Error::Bluetooth)?;

        // The link does not report a negotiated MTU, so reads are bounded by
        // the same default chunk size the peripheral was designed against.
        data.truncate(DEFAULT_MTU);

        trace!(
            "Read {} bytes from characteristic {}",
            data.len(),
            characteristic.uuid
        );

        Ok(data)
    }

    async fn subscribe_notify(&self, characteristic: &DiscoveredCharacteristic) -> Result<()> {
        let inner = self.cached_characteristic(characteristic.uuid)?;

        self.ensure_listener().await?;

        self.peripheral
            .subscribe(&inner)
            .await
            .map_err(|source| Error::Subscription {
                uuid: characteristic.uuid,
                source,
            })?;

        debug!("Subscribed to notifications from {}", characteristic.uuid);
        Ok(())
    }

    fn notifications(&self) -> broadcast::Receiver<NotificationEvent> {
        self.notification_tx.subscribe()
    }
}

impl Drop for BleGattClient {
    fn drop(&mut self) {
        if let Some(handle) = self.listener_handle.write().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::{THERMO_NOTIFY_UUID, THERMO_SERVICE_UUID};

    #[test]
    fn test_service_handle_identity() {
        let handle = ServiceHandle::new(THERMO_SERVICE_UUID);
        assert_eq!(handle.uuid(), THERMO_SERVICE_UUID);
    }

    #[test]
    fn test_discovered_characteristic_equality() {
        let a = DiscoveredCharacteristic {
            uuid: THERMO_NOTIFY_UUID,
            service_uuid: THERMO_SERVICE_UUID,
        };
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn test_notification_event_clone() {
        let event = NotificationEvent {
            characteristic_uuid: THERMO_NOTIFY_UUID,
            data: vec![1, b'2', b'3'],
        };
        let cloned = event.clone();
        assert_eq!(event.characteristic_uuid, cloned.characteristic_uuid);
        assert_eq!(event.data, cloned.data);
    }
}
