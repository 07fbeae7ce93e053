use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A cached payload plus the instant it stops being usable.
///
/// This is also the durable record format: one `{key, expires_at, payload}`
/// JSON document per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub expires_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl CacheEntry {
    pub fn new<T: Serialize>(
        key: impl Into<String>,
        value: &T,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            key: key.into(),
            expires_at,
            payload: serde_json::to_value(value)?,
        })
    }

    /// Usable only while `now < expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}
