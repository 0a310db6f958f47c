use crate::{fields::non_blank, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Textual record identifier.
///
/// The store mints these from UUIDv7 values, but any non-blank text is accepted
/// as a reference so identifiers issued elsewhere round-trip unchanged. On the
/// wire it is always a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub(crate) fn for_field(field: &'static str, value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = non_blank(field, value.into())?;
        Ok(RecordId(value.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        RecordId(id.hyphenated().to_string())
    }
}

impl TryFrom<String> for RecordId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RecordId::for_field("id", value)
    }
}

impl TryFrom<&str> for RecordId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        RecordId::for_field("id", value)
    }
}

impl FromStr for RecordId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::try_from(s)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record together with the identifier the store assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: T,
}

impl<T> Stored<T> {
    pub fn new(id: RecordId, record: T) -> Self {
        Stored { id, record }
    }
}
