//! BLE Service and Characteristic UUIDs.
//!
//! The FM100 exposes a fixed set of services, all identified by 16-bit
//! aliases in the standard 128-bit Bluetooth UUID space.

use uuid::Uuid;

/// The Bluetooth base UUID, `00000000-0000-1000-8000-00805F9B34FB`.
const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_00805f9b34fb;

/// Expand a 16-bit alias into the full 128-bit Bluetooth UUID space.
pub const fn short_uuid(alias: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((alias as u128) << 96))
}

// Generic Access Service (Standard BLE)
/// Standard BLE Generic Access Service UUID.
pub const GENERIC_ACCESS_SERVICE_UUID: Uuid = short_uuid(0x1800);
/// Device Name characteristic UUID.
pub const DEVICE_NAME_UUID: Uuid = short_uuid(0x2A00);

// Device Information Service (Standard BLE)
/// Standard BLE Device Information Service UUID.
pub const DEVICE_INFO_SERVICE_UUID: Uuid = short_uuid(0x180A);
/// Model Number characteristic UUID.
pub const MODEL_NUMBER_UUID: Uuid = short_uuid(0x2A24);
/// Serial Number characteristic UUID.
pub const SERIAL_NUMBER_UUID: Uuid = short_uuid(0x2A25);
/// Hardware Revision characteristic UUID.
pub const HARDWARE_REVISION_UUID: Uuid = short_uuid(0x2A27);
/// Firmware Revision characteristic UUID (Software Revision String, 0x2A28).
pub const FIRMWARE_REVISION_UUID: Uuid = short_uuid(0x2A28);
/// Manufacturer Name characteristic UUID.
pub const MANUFACTURER_NAME_UUID: Uuid = short_uuid(0x2A29);

// Thermo Service (FM100 vendor service)
/// FM100 thermo service UUID.
pub const THERMO_SERVICE_UUID: Uuid = short_uuid(0xFF00);
/// FM100 thermo notify characteristic UUID.
///
/// Whether this characteristic also accepts writes is unspecified; the
/// gateway only subscribes to it.
pub const THERMO_NOTIFY_UUID: Uuid = short_uuid(0xFF01);

/// The device-information characteristics requested in one batch.
pub const DEVICE_INFO_CHARACTERISTICS: [Uuid; 5] = [
    MODEL_NUMBER_UUID,
    SERIAL_NUMBER_UUID,
    HARDWARE_REVISION_UUID,
    FIRMWARE_REVISION_UUID,
    MANUFACTURER_NAME_UUID,
];
