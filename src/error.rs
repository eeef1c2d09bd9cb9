//! Error types for the fm100-gateway crate.

use thiserror::Error;
use uuid::Uuid;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// The configured peripheral address could not be parsed.
    #[error("Invalid peripheral address: {address}")]
    InvalidAddress {
        /// The address string that failed to parse.
        address: String,
    },

    /// The peripheral advertises no service with the requested UUID.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: Uuid,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: Uuid,
    },

    /// Enabling notifications on a characteristic failed.
    #[error("Subscription failed for {uuid}: {source}")]
    Subscription {
        /// The UUID of the notify characteristic.
        uuid: Uuid,
        /// The underlying BLE error.
        source: btleplug::Error,
    },

    /// Malformed or undecodable bytes were received from the peripheral.
    #[error("Decode error: {context}")]
    Decode {
        /// Description of what was invalid about the data.
        context: String,
    },

    /// Publishing a message through the MQTT transport failed.
    #[error("Transport error: {0}")]
    Transport(#[from] rumqttc::ClientError),

    /// A payload could not be serialized to JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The gateway configuration file could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    /// An I/O error occurred while reading the configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
