//! Probe readings decoded from thermo notifications.
//!
//! A notification frame carries the probe index in its first byte followed by
//! the temperature rendered as a UTF-8 decimal string. The value is forwarded
//! to the publisher as received, without numeric normalization.

use crate::error::{Error, Result};

/// Number of probes on the FM100 device.
pub const PROBE_COUNT: u8 = 4;

/// A probe index in the dense `1..=4` domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProbeIndex(u8);

impl ProbeIndex {
    /// Create a probe index, rejecting values outside `1..=4`.
    pub fn new(index: u8) -> Option<Self> {
        (1..=PROBE_COUNT).contains(&index).then_some(Self(index))
    }

    /// Iterate over all probe indices in order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=PROBE_COUNT).map(Self)
    }

    /// The raw index value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-padded two-digit rendering, shared by the config and state
    /// topic paths (`"01"`..`"04"`).
    pub fn two_digit(self) -> String {
        format!("{:02}", self.0)
    }
}

impl std::fmt::Display for ProbeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single decoded probe reading.
///
/// Transient: created per notification and consumed immediately by the
/// publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReading {
    /// Which probe the value belongs to.
    pub probe: ProbeIndex,
    /// Decoded temperature value, a unit-less decimal string.
    pub value: String,
}

impl ProbeReading {
    /// Decode a notification frame into a reading.
    ///
    /// The first byte is the probe index; the remainder is the UTF-8 decimal
    /// value. Malformed frames yield a [`Error::Decode`] and are expected to
    /// be dropped by the caller.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let (&index, value) = frame.split_first().ok_or_else(|| Error::Decode {
            context: "empty notification frame".to_string(),
        })?;

        let probe = ProbeIndex::new(index).ok_or_else(|| Error::Decode {
            context: format!("probe index {} outside 1..={}", index, PROBE_COUNT),
        })?;

        let value = std::str::from_utf8(value).map_err(|_| Error::Decode {
            context: format!("non-UTF-8 value for probe {}", probe),
        })?;

        if value.is_empty() {
            return Err(Error::Decode {
                context: format!("empty value for probe {}", probe),
            });
        }

        Ok(Self {
            probe,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_probe_index_bounds() {
        assert!(ProbeIndex::new(0).is_none());
        assert!(ProbeIndex::new(5).is_none());
        for index in 1..=4 {
            assert_eq!(ProbeIndex::new(index).unwrap().get(), index);
        }
    }

    #[test]
    fn test_two_digit_rendering() {
        let rendered: Vec<String> = ProbeIndex::all().map(ProbeIndex::two_digit).collect();
        assert_eq!(rendered, vec!["01", "02", "03", "04"]);
    }

    #[test]
    fn test_decode_reading() {
        let reading = ProbeReading::decode(&[1, b'2', b'3', b'.', b'4']).unwrap();
        assert_eq!(reading.probe.get(), 1);
        assert_eq!(reading.value, "23.4");
    }

    #[test]
    fn test_decode_rejects_empty_frame() {
        let err = ProbeReading::decode(&[]).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_decode_rejects_bad_index() {
        let err = ProbeReading::decode(&[9, b'2', b'0']).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = ProbeReading::decode(&[2, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_decode_rejects_missing_value() {
        let err = ProbeReading::decode(&[3]).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
