use crate::fields::Fields;
use crate::{RecordId, ScanRequest, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Scanner collaborator: inspects the database behind a request and reports
/// findings in the order it produced them.
pub trait Scanner {
    fn scan(&self, request: &ScanRequest) -> anyhow::Result<Vec<String>>;
}

/// The outcome of one scan run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ScanRecord {
    registration_id: RecordId,
    findings: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

impl ScanRecord {
    /// An empty `findings` list means the scan ran and found nothing.
    pub fn new(registration_id: impl Into<String>, findings: Vec<String>) -> Result<Self, ValidationError> {
        Ok(ScanRecord {
            registration_id: RecordId::for_field("registration_id", registration_id)?,
            findings,
            timestamp: OffsetDateTime::now_utc(),
        })
    }

    /// Runs `scanner` against `request` and records what it found.
    pub fn run(registration_id: &RecordId, request: &ScanRequest, scanner: &dyn Scanner) -> anyhow::Result<Self> {
        let findings = scanner.scan(request)?;
        Ok(Self::new(registration_id.clone(), findings)?)
    }

    pub fn registration_id(&self) -> &RecordId {
        &self.registration_id
    }

    pub fn findings(&self) -> &[String] {
        &self.findings
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

impl TryFrom<Value> for ScanRecord {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let f = Fields::of(&value)?;
        let timestamp = f.opt_timestamp("timestamp", &[])?.unwrap_or_else(OffsetDateTime::now_utc);
        Ok(ScanRecord {
            registration_id: RecordId::for_field("registration_id", f.text("registration_id", &["user_uri_id"])?)?,
            findings: f.text_list("findings", &[])?,
            timestamp,
        })
    }
}
