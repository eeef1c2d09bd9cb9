//! Device identity read from the peripheral.

/// Identity strings read from the generic-access and device-information
/// services.
///
/// Fields are populated incrementally as characteristics are read; a partial
/// identity is valid and missing fields are simply not reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Device name from the generic-access service.
    pub name: Option<String>,
    /// Model number string.
    pub model: Option<String>,
    /// Serial number string.
    pub serial: Option<String>,
    /// Hardware revision string.
    pub hardware_revision: Option<String>,
    /// Firmware revision string.
    pub firmware_revision: Option<String>,
    /// Manufacturer name string.
    pub manufacturer: Option<String>,
}

impl DeviceIdentity {
    /// Number of populated identity fields.
    pub fn populated_fields(&self) -> usize {
        [
            &self.name,
            &self.model,
            &self.serial,
            &self.hardware_revision,
            &self.firmware_revision,
            &self.manufacturer,
        ]
        .iter()
        .filter(|field| field.is_some())
        .count()
    }

    /// The device name, or the given fallback if it was never read.
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_identity_is_empty() {
        let identity = DeviceIdentity::default();
        assert_eq!(identity.populated_fields(), 0);
        assert_eq!(identity.name_or("FM100B"), "FM100B");
    }

    #[test]
    fn test_partial_identity() {
        let identity = DeviceIdentity {
            name: Some("FM100B".to_string()),
            serial: Some("SN-001".to_string()),
            ..Default::default()
        };
        assert_eq!(identity.populated_fields(), 2);
        assert_eq!(identity.name_or("fallback"), "FM100B");
    }
}
