use anyhow::Result;
use rusqlite::Row;
use serde_json::{json, Value};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset};
use uriscan_core::{ConnectionRegistration, PersistedAccount, RecordId, ScanRecord, Stored};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },
    #[error("refusing to store a password that is not hashed")]
    PlaintextPassword,
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: &RecordId) -> Self {
        StoreError::NotFound { kind, id: id.to_string() }
    }
}

pub(crate) fn ts_text(at: OffsetDateTime) -> Result<String> {
    Ok(at.to_offset(UtcOffset::UTC).format(&Rfc3339)?)
}

// Rows are read as raw text inside rusqlite closures and turned into records
// afterwards, through the same validation the wire format uses.

pub(crate) struct AccountRow {
    id: String,
    username: String,
    password: String,
    role: String,
}

impl AccountRow {
    pub const COLUMNS: &'static str = "account_id, username, password, role";

    pub fn read(r: &Row) -> rusqlite::Result<Self> {
        Ok(AccountRow { id: r.get(0)?, username: r.get(1)?, password: r.get(2)?, role: r.get(3)? })
    }

    pub fn into_record(self) -> Result<PersistedAccount> {
        let value = json!({ "id": self.id, "username": self.username, "password": self.password, "role": self.role });
        Ok(PersistedAccount::try_from(value)?)
    }
}

pub(crate) struct ConnectionRow {
    id: String,
    account_id: String,
    encrypted_uri: String,
    alias: Option<String>,
    last_scan: Option<String>,
    created_at: String,
}

impl ConnectionRow {
    pub const COLUMNS: &'static str = "connection_id, account_id, encrypted_uri, alias, last_scan, created_at";

    pub fn read(r: &Row) -> rusqlite::Result<Self> {
        Ok(ConnectionRow {
            id: r.get(0)?,
            account_id: r.get(1)?,
            encrypted_uri: r.get(2)?,
            alias: r.get(3)?,
            last_scan: r.get(4)?,
            created_at: r.get(5)?,
        })
    }

    pub fn into_record(self) -> Result<Stored<ConnectionRegistration>> {
        let value = json!({
            "account_id": self.account_id,
            "encrypted_uri": self.encrypted_uri,
            "alias": self.alias,
            "last_scan": self.last_scan,
            "created_at": self.created_at,
        });
        Ok(Stored::new(RecordId::try_from(self.id)?, ConnectionRegistration::try_from(value)?))
    }
}

pub(crate) struct ScanRow {
    id: String,
    connection_id: String,
    findings_json: String,
    recorded_at: String,
}

impl ScanRow {
    pub const COLUMNS: &'static str = "scan_id, connection_id, findings_json, recorded_at";

    pub fn read(r: &Row) -> rusqlite::Result<Self> {
        Ok(ScanRow { id: r.get(0)?, connection_id: r.get(1)?, findings_json: r.get(2)?, recorded_at: r.get(3)? })
    }

    pub fn into_record(self) -> Result<Stored<ScanRecord>> {
        let findings: Value = serde_json::from_str(&self.findings_json)?;
        let value = json!({
            "registration_id": self.connection_id,
            "findings": findings,
            "timestamp": self.recorded_at,
        });
        Ok(Stored::new(RecordId::try_from(self.id)?, ScanRecord::try_from(value)?))
    }
}
