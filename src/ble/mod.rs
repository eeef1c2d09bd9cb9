//! BLE communication module.
//!
//! Low-level Bluetooth Low Energy functionality: the GATT client seam, the
//! fixed UUID set of the FM100, and link bring-up/watching.

pub mod client;
pub mod link;
pub mod uuids;

pub use client::{
    BleGattClient, DiscoveredCharacteristic, GattClient, NotificationEvent, ServiceHandle,
};
pub use link::LinkManager;
pub use uuids::*;
