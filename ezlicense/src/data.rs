//! License data model.
//!
//! On the wire a license payload is a JSON object:
//!
//! ```json
//! {"expires": 1767225600, "additional_data": {"seats": 5}}
//! ```
//!
//! `expires` is seconds since the Unix epoch. `0` is the sentinel for a
//! license that never expires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Wire value of `expires` for a license that never expires.
pub const NEVER_EXPIRES: i64 = 0;

/// When a license stops being valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Expiry {
    /// The license is perpetual. No time check is ever performed.
    #[default]
    Never,
    /// The license expires at this instant (seconds since the Unix epoch).
    At(i64),
}

impl Expiry {
    /// Builds an expiry from a wire value, mapping the sentinel to `Never`.
    #[must_use]
    pub const fn from_unix(secs: i64) -> Self {
        if secs == NEVER_EXPIRES {
            Self::Never
        } else {
            Self::At(secs)
        }
    }

    /// Builds an expiry from a UTC datetime.
    #[must_use]
    pub fn at(when: DateTime<Utc>) -> Self {
        Self::from_unix(when.timestamp())
    }

    /// Returns the wire value.
    #[must_use]
    pub const fn as_unix(&self) -> i64 {
        match self {
            Self::Never => NEVER_EXPIRES,
            Self::At(secs) => *secs,
        }
    }

    /// Returns the expiration instant, or None for a perpetual license.
    #[must_use]
    pub const fn instant(&self) -> Option<i64> {
        match self {
            Self::Never => None,
            Self::At(secs) => Some(*secs),
        }
    }

    /// Returns true if the license never expires.
    #[must_use]
    pub const fn is_never(&self) -> bool {
        matches!(self, Self::Never)
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_unix())
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::from_unix)
    }
}

/// The useful data of a license, decoded and without a signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicenseData {
    /// Expiration instant.
    pub expires: Expiry,
    /// Application-specific entitlements.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub additional_data: BTreeMap<String, Value>,
}

impl LicenseData {
    /// Creates a perpetual license with no additional data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expiry.
    #[must_use]
    pub fn with_expiry(mut self, expires: Expiry) -> Self {
        self.expires = expires;
        self
    }

    /// Adds an entry to the additional data.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_data.insert(key.into(), value.into());
        self
    }

    /// Looks up an additional data entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.additional_data.get(key)
    }

    /// Returns true if the license carries an expiration instant.
    #[must_use]
    pub fn has_expiry(&self) -> bool {
        !self.expires.is_never()
    }
}

/// Issuers that hold no additional data may write `null` for the map.
fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The signed, pre-armor form of a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// base64 encoded JSON of the [`LicenseData`].
    pub data: String,
    /// base64 RSA-PSS signature over the SHA-256 digest of `data`.
    pub signature: String,
}
