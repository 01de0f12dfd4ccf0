//! Three-part version numbers as carried in `VersionType` elements

use serde::{Serialize, Serializer};
use std::fmt;

/// A `major.minor.revision` version triple
///
/// SGP.22 encodes versions as a 3-byte OCTET STRING. Shorter values are
/// zero-padded and extra bytes are ignored, so an absent element reads as
/// `0.0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub [u8; 3]);

impl Version {
    /// Create a version from its parts
    pub const fn new(major: u8, minor: u8, revision: u8) -> Self {
        Self([major, minor, revision])
    }

    /// Read a version from the raw bytes of a `VersionType` value
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut parts = [0u8; 3];
        for (part, byte) in parts.iter_mut().zip(bytes) {
            *part = *byte;
        }
        Self(parts)
    }

    /// Whether every part is zero
    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0[0], self.0[1], self.0[2])
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
