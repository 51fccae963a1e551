use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::short_id::{is_canonical, SHORT_ID_LEN};

/// Primary keys of append-only tables (the notification outbox) are BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Length of a canonical [`ObjectId`] in hex characters.
pub const OBJECT_ID_LEN: usize = 24;

/// Canonical document identifier: 24 lowercase hex characters.
///
/// The first 8 characters encode the creation time in seconds (big-endian),
/// the remaining 16 are random. Ids created later therefore sort after ids
/// created earlier, at one-second granularity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Generate a fresh id stamped with the current time.
    pub fn new() -> Self {
        Self::generate_at(chrono::Utc::now())
    }

    /// Generate a fresh id stamped with `at`.
    pub fn generate_at(at: Timestamp) -> Self {
        let secs = at.timestamp().clamp(0, i64::from(u32::MAX)) as u32;
        let random = rand::random::<u64>();

        let mut hex = String::with_capacity(OBJECT_ID_LEN);
        for byte in secs.to_be_bytes().iter().chain(random.to_be_bytes().iter()) {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    /// Parse a canonical id. Uppercase hex is accepted and lowercased.
    pub fn parse(input: &str) -> Option<Self> {
        is_canonical(input).then(|| Self(input.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The public short form: the last [`SHORT_ID_LEN`] characters.
    pub fn short(&self) -> &str {
        &self.0[OBJECT_ID_LEN - SHORT_ID_LEN..]
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            CoreError::Validation(format!(
                "'{s}' is not a valid id (expected {OBJECT_ID_LEN} hex characters)"
            ))
        })
    }
}

impl TryFrom<String> for ObjectId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}
