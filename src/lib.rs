//! BLE to MQTT gateway for the FM100 four-probe thermometer.
//!
//! The gateway maintains a session with a single FM100 peripheral: it scans
//! for the configured hardware address, connects, resolves the device profile
//! over GATT, announces the device to the automation hub with a retained
//! discovery document, and then streams per-probe temperature readings as
//! MQTT state messages.
//!
//! The crate is split along its natural seams:
//!
//! - [`ble`]: adapter bring-up, the [`GattClient`] trait and its btleplug
//!   implementation, and the 16-bit UUID table of the FM100 profile.
//! - [`profile`]: the fixed discovery script run after every connect.
//! - [`mqtt`]: the [`MessageTransport`](mqtt::MessageTransport) boundary,
//!   topic naming, payload models, and the telemetry publisher.
//! - [`session`]: the connection session state machine tying it together.

pub mod ble;
pub mod config;
pub mod error;
pub mod identity;
pub mod mqtt;
pub mod profile;
pub mod reading;
pub mod session;

pub use ble::client::{BleGattClient, GattClient, NotificationEvent};
pub use ble::link::LinkManager;
pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use identity::DeviceIdentity;
pub use mqtt::{DeviceId, MqttTransport, TelemetryPublisher};
pub use profile::{resolve_profile, ResolvedProfile};
pub use reading::{ProbeIndex, ProbeReading};
pub use session::{LinkEvent, Session, SessionDriver, SessionStatus};
