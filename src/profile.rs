//! Device profile resolution.
//!
//! Runs the fixed discovery script against a freshly connected peripheral:
//! device name from the generic-access service, the identity batch from the
//! device-information service, and the thermo notify characteristic. Identity
//! failures are logged and absorbed; only the thermo path is fatal, since
//! without it no telemetry is possible.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ble::client::{DiscoveredCharacteristic, GattClient};
use crate::ble::uuids::{
    DEVICE_INFO_CHARACTERISTICS, DEVICE_INFO_SERVICE_UUID, DEVICE_NAME_UUID,
    FIRMWARE_REVISION_UUID, GENERIC_ACCESS_SERVICE_UUID, HARDWARE_REVISION_UUID,
    MANUFACTURER_NAME_UUID, MODEL_NUMBER_UUID, SERIAL_NUMBER_UUID, THERMO_NOTIFY_UUID,
    THERMO_SERVICE_UUID,
};
use crate::error::{Error, Result};
use crate::identity::DeviceIdentity;

/// Outcome of a successful profile resolution.
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    /// Identity read from the peripheral; partial identity is valid.
    pub identity: DeviceIdentity,
    /// The thermo notify characteristic to subscribe to.
    pub notify_characteristic: DiscoveredCharacteristic,
}

/// Run the discovery script against a connected peripheral.
///
/// # Errors
///
/// Returns an error only when the thermo service or its notify characteristic
/// cannot be resolved; identity lookups fail soft.
pub async fn resolve_profile<C: GattClient + ?Sized>(client: &C) -> Result<ResolvedProfile> {
    let mut identity = DeviceIdentity::default();

    if let Err(e) = read_device_name(client, &mut identity).await {
        warn!("Could not read device name: {}", e);
    }

    if let Err(e) = read_device_information(client, &mut identity).await {
        warn!("Could not read device information: {}", e);
    }

    let notify_characteristic = resolve_thermo_notify(client).await?;

    Ok(ResolvedProfile {
        identity,
        notify_characteristic,
    })
}

/// Step 1: the device name from the generic-access service.
async fn read_device_name<C: GattClient + ?Sized>(
    client: &C,
    identity: &mut DeviceIdentity,
) -> Result<()> {
    let service = client.discover_service(GENERIC_ACCESS_SERVICE_UUID).await?;
    let characteristics = client
        .discover_characteristics(&service, vec![DEVICE_NAME_UUID])
        .await?;

    // Discovery order is not trusted; match the result by UUID.
    let characteristic = characteristics
        .iter()
        .find(|c| c.uuid == DEVICE_NAME_UUID)
        .ok_or(Error::CharacteristicNotFound {
            uuid: DEVICE_NAME_UUID,
        })?;

    let data = client.read_value(characteristic).await?;
    match decode_utf8(data, DEVICE_NAME_UUID) {
        Ok(name) => {
            info!("Connected to device: {}", name);
            identity.name = Some(name);
        }
        Err(e) => debug!("{}", e),
    }

    Ok(())
}

/// Step 2: the identity batch from the device-information service.
///
/// The peripheral may return any subset of the requested characteristics; an
/// absent characteristic leaves its identity field unset and is not an error.
async fn read_device_information<C: GattClient + ?Sized>(
    client: &C,
    identity: &mut DeviceIdentity,
) -> Result<()> {
    let service = client.discover_service(DEVICE_INFO_SERVICE_UUID).await?;
    let characteristics = client
        .discover_characteristics(&service, DEVICE_INFO_CHARACTERISTICS.to_vec())
        .await?;

    for requested in DEVICE_INFO_CHARACTERISTICS {
        let Some(characteristic) = characteristics.iter().find(|c| c.uuid == requested) else {
            debug!(
                "Characteristic {} absent from device information batch",
                requested
            );
            continue;
        };

        let data = match client.read_value(characteristic).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Could not read characteristic {}: {}", requested, e);
                continue;
            }
        };

        match decode_utf8(data, requested) {
            Ok(value) => {
                debug!("Device info {}: {}", requested, value);
                if let Some(slot) = identity_slot(identity, requested) {
                    *slot = Some(value);
                }
            }
            Err(e) => debug!("{}", e),
        }
    }

    Ok(())
}

/// Step 3: the thermo notify characteristic. Fatal when missing.
async fn resolve_thermo_notify<C: GattClient + ?Sized>(
    client: &C,
) -> Result<DiscoveredCharacteristic> {
    let service = client.discover_service(THERMO_SERVICE_UUID).await?;
    let characteristics = client
        .discover_characteristics(&service, vec![THERMO_NOTIFY_UUID])
        .await?;

    characteristics
        .into_iter()
        .find(|c| c.uuid == THERMO_NOTIFY_UUID)
        .ok_or(Error::CharacteristicNotFound {
            uuid: THERMO_NOTIFY_UUID,
        })
}

/// The identity field a device-information characteristic populates.
fn identity_slot(identity: &mut DeviceIdentity, uuid: Uuid) -> Option<&mut Option<String>> {
    if uuid == MODEL_NUMBER_UUID {
        Some(&mut identity.model)
    } else if uuid == SERIAL_NUMBER_UUID {
        Some(&mut identity.serial)
    } else if uuid == HARDWARE_REVISION_UUID {
        Some(&mut identity.hardware_revision)
    } else if uuid == FIRMWARE_REVISION_UUID {
        Some(&mut identity.firmware_revision)
    } else if uuid == MANUFACTURER_NAME_UUID {
        Some(&mut identity.manufacturer)
    } else {
        None
    }
}

fn decode_utf8(data: Vec<u8>, uuid: Uuid) -> Result<String> {
    String::from_utf8(data).map_err(|_| Error::Decode {
        context: format!("invalid UTF-8 in characteristic {}", uuid),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::client::{MockGattClient, ServiceHandle};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn characteristic(uuid: Uuid, service_uuid: Uuid) -> DiscoveredCharacteristic {
        DiscoveredCharacteristic { uuid, service_uuid }
    }

    /// Wire up a mock that resolves every service and returns the given
    /// characteristic subsets.
    fn mock_with_batches(
        name_batch: Vec<DiscoveredCharacteristic>,
        info_batch: Vec<DiscoveredCharacteristic>,
        thermo_batch: Vec<DiscoveredCharacteristic>,
    ) -> MockGattClient {
        let mut client = MockGattClient::new();

        client
            .expect_discover_service()
            .returning(|uuid| Ok(ServiceHandle::new(uuid)));

        client
            .expect_discover_characteristics()
            .withf(|service, _| service.uuid() == GENERIC_ACCESS_SERVICE_UUID)
            .returning(move |_, _| Ok(name_batch.clone()));
        client
            .expect_discover_characteristics()
            .withf(|service, _| service.uuid() == DEVICE_INFO_SERVICE_UUID)
            .returning(move |_, _| Ok(info_batch.clone()));
        client
            .expect_discover_characteristics()
            .withf(|service, _| service.uuid() == THERMO_SERVICE_UUID)
            .returning(move |_, _| Ok(thermo_batch.clone()));

        client
    }

    #[tokio::test]
    async fn test_full_resolution() {
        let mut client = mock_with_batches(
            vec![characteristic(DEVICE_NAME_UUID, GENERIC_ACCESS_SERVICE_UUID)],
            DEVICE_INFO_CHARACTERISTICS
                .iter()
                .map(|&uuid| characteristic(uuid, DEVICE_INFO_SERVICE_UUID))
                .collect(),
            vec![characteristic(THERMO_NOTIFY_UUID, THERMO_SERVICE_UUID)],
        );

        client
            .expect_read_value()
            .with(eq(characteristic(
                DEVICE_NAME_UUID,
                GENERIC_ACCESS_SERVICE_UUID,
            )))
            .returning(|_| Ok(b"FM100B".to_vec()));
        client
            .expect_read_value()
            .returning(|c| Ok(format!("value-{}", c.uuid).into_bytes()));

        let profile = resolve_profile(&client).await.unwrap();

        assert_eq!(profile.identity.name.as_deref(), Some("FM100B"));
        assert_eq!(profile.identity.populated_fields(), 6);
        assert_eq!(profile.notify_characteristic.uuid, THERMO_NOTIFY_UUID);
    }

    #[tokio::test]
    async fn test_partial_device_info_batch_is_not_an_error() {
        // Four of the five requested device-information characteristics come
        // back; the generic-access lookup fails soft.
        let returned: Vec<DiscoveredCharacteristic> = [
            MODEL_NUMBER_UUID,
            SERIAL_NUMBER_UUID,
            HARDWARE_REVISION_UUID,
            MANUFACTURER_NAME_UUID,
        ]
        .iter()
        .map(|&uuid| characteristic(uuid, DEVICE_INFO_SERVICE_UUID))
        .collect();

        let mut client = MockGattClient::new();
        client
            .expect_discover_service()
            .with(eq(GENERIC_ACCESS_SERVICE_UUID))
            .returning(|uuid| Err(Error::ServiceNotFound { uuid }));
        client
            .expect_discover_service()
            .returning(|uuid| Ok(ServiceHandle::new(uuid)));
        client
            .expect_discover_characteristics()
            .withf(|service, _| service.uuid() == DEVICE_INFO_SERVICE_UUID)
            .returning(move |_, _| Ok(returned.clone()));
        client
            .expect_discover_characteristics()
            .withf(|service, _| service.uuid() == THERMO_SERVICE_UUID)
            .returning(|_, _| {
                Ok(vec![characteristic(THERMO_NOTIFY_UUID, THERMO_SERVICE_UUID)])
            });
        client
            .expect_read_value()
            .returning(|c| Ok(format!("value-{}", c.uuid).into_bytes()));

        let profile = resolve_profile(&client).await.unwrap();

        assert_eq!(profile.identity.populated_fields(), 4);
        assert_eq!(profile.identity.firmware_revision, None);
        assert_eq!(profile.identity.name, None);
    }

    #[tokio::test]
    async fn test_results_matched_by_uuid_not_position() {
        // The peripheral answers the name request with an unrelated
        // characteristic first; only the UUID match may be read.
        let mut client = mock_with_batches(
            vec![
                characteristic(MODEL_NUMBER_UUID, GENERIC_ACCESS_SERVICE_UUID),
                characteristic(DEVICE_NAME_UUID, GENERIC_ACCESS_SERVICE_UUID),
            ],
            vec![],
            vec![characteristic(THERMO_NOTIFY_UUID, THERMO_SERVICE_UUID)],
        );

        client
            .expect_read_value()
            .with(eq(characteristic(
                DEVICE_NAME_UUID,
                GENERIC_ACCESS_SERVICE_UUID,
            )))
            .times(1)
            .returning(|_| Ok(b"FM100B".to_vec()));

        let profile = resolve_profile(&client).await.unwrap();
        assert_eq!(profile.identity.name.as_deref(), Some("FM100B"));
    }

    #[tokio::test]
    async fn test_undecodable_identity_bytes_leave_field_unset() {
        let mut client = mock_with_batches(
            vec![characteristic(DEVICE_NAME_UUID, GENERIC_ACCESS_SERVICE_UUID)],
            vec![characteristic(SERIAL_NUMBER_UUID, DEVICE_INFO_SERVICE_UUID)],
            vec![characteristic(THERMO_NOTIFY_UUID, THERMO_SERVICE_UUID)],
        );

        client
            .expect_read_value()
            .returning(|_| Ok(vec![0xff, 0xfe, 0xfd]));

        let profile = resolve_profile(&client).await.unwrap();
        assert_eq!(profile.identity.populated_fields(), 0);
    }

    #[tokio::test]
    async fn test_missing_thermo_service_is_fatal() {
        let mut client = MockGattClient::new();
        client
            .expect_discover_service()
            .with(eq(THERMO_SERVICE_UUID))
            .returning(|uuid| Err(Error::ServiceNotFound { uuid }));
        client
            .expect_discover_service()
            .returning(|uuid| Err(Error::ServiceNotFound { uuid }));

        let err = resolve_profile(&client).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ServiceNotFound { uuid } if uuid == THERMO_SERVICE_UUID
        ));
    }

    #[tokio::test]
    async fn test_missing_notify_characteristic_is_fatal() {
        let client = mock_with_batches(vec![], vec![], vec![]);

        // Empty thermo batch: the service resolved but the notify
        // characteristic is absent.
        let err = resolve_profile(&client).await.unwrap_err();
        assert!(matches!(
            err,
            Error::CharacteristicNotFound { uuid } if uuid == THERMO_NOTIFY_UUID
        ));
    }
}
