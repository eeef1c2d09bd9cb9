//! Link-layer bring-up and connection watching.
//!
//! Owns the Bluetooth adapter, scans for the configured peripheral address,
//! initiates the connection and translates adapter-level connect/disconnect
//! events into [`LinkEvent`]s on the session channel. The session driver is
//! the sole consumer; no session state lives here.

use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ble::client::BleGattClient;
use crate::error::{Error, Result};
use crate::session::LinkEvent;

/// Watches the radio link to a single peripheral.
pub struct LinkManager {
    /// The Bluetooth adapter to use.
    adapter: Adapter,
    /// Hardware address of the target peripheral.
    address: BDAddr,
}

impl LinkManager {
    /// Enable the first available Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new(address: BDAddr) -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self { adapter, address })
    }

    /// Create a link manager with a specific adapter.
    pub fn with_adapter(adapter: Adapter, address: BDAddr) -> Self {
        Self { adapter, address }
    }

    /// Scan for the target peripheral, connect, and forward link events until
    /// the session channel closes.
    ///
    /// A lost connection leaves scanning active, so the next advertisement
    /// from the target triggers a fresh connect attempt and a new session.
    pub async fn run(self, events: mpsc::Sender<LinkEvent<BleGattClient>>) -> Result<()> {
        let mut adapter_events = self.adapter.events().await.map_err(Error::Bluetooth)?;

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        info!("Scanning for peripheral {}", self.address);

        let mut connected_id: Option<PeripheralId> = None;

        while let Some(event) = adapter_events.next().await {
            match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                    if connected_id.is_some() {
                        continue;
                    }
                    let Some(peripheral) = self.matching_peripheral(&id).await else {
                        continue;
                    };

                    debug!("Target peripheral advertising, connecting");
                    if let Err(e) = peripheral.connect().await {
                        warn!("Connection attempt failed: {}", e);
                    }
                }
                CentralEvent::DeviceConnected(id) => {
                    let Some(peripheral) = self.matching_peripheral(&id).await else {
                        continue;
                    };

                    connected_id = Some(id);
                    info!("Link established with {}", self.address);

                    let client = BleGattClient::new(peripheral);
                    if events.send(LinkEvent::Connected(client)).await.is_err() {
                        break;
                    }
                }
                CentralEvent::DeviceDisconnected(id) => {
                    if connected_id.as_ref() != Some(&id) {
                        continue;
                    }

                    connected_id = None;
                    info!("Link lost with {}", self.address);

                    if events.send(LinkEvent::Disconnected).await.is_err() {
                        break;
                    }
                }
                _ => {}
            }
        }

        debug!("Adapter event stream ended");
        Ok(())
    }

    /// Resolve a peripheral id and check it against the target address.
    async fn matching_peripheral(&self, id: &PeripheralId) -> Option<Peripheral> {
        let peripheral = self.adapter.peripheral(id).await.ok()?;
        (peripheral.address() == self.address).then_some(peripheral)
    }
}
