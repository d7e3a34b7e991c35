//! Strong type definitions for envlock.
//!
//! Identifiers are newtypes so an invite id can never be passed where a
//! request id is expected.

use std::fmt;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto;

/// Schema version written into every persisted record.
pub const RECORD_VERSION: u32 = 1;

/// Random bytes behind an invite or request identifier.
pub const ID_BYTES: usize = 8;

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier, trimming surrounding whitespace.
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(id.as_ref().trim().to_string())
            }

            /// Generate a fresh random identifier.
            pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
                Self(crypto::random_hex(rng, ID_BYTES))
            }

            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self::new(id)
            }
        }
    };
}

hex_id!(
    /// Identifier of an invite, 16 lowercase hex characters when generated.
    InviteId
);

hex_id!(
    /// Identifier of an enrollment request, 16 lowercase hex characters when generated.
    RequestId
);

/// Serde adapter for `version` fields: absent or zero reads as [`RECORD_VERSION`].
pub(crate) mod version {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::RECORD_VERSION;

    pub fn current() -> u32 {
        RECORD_VERSION
    }

    pub fn serialize<S: Serializer>(version: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32((*version).max(RECORD_VERSION))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        Ok(u32::deserialize(deserializer)?.max(RECORD_VERSION))
    }
}

/// Serde adapter for optional timestamps.
///
/// Older clients write the zero time `0001-01-01T00:00:00Z` instead of
/// omitting the field; it reads back as `None`.
pub(crate) mod opt_time {
    use chrono::{DateTime, Datelike, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
        Ok(value.filter(|t| t.year() > 1))
    }
}
