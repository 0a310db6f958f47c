use crate::models::{ts_text, AccountRow, ConnectionRow, StoreError};
use crate::Db;
use anyhow::Result;
use rusqlite::{params, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};
use uriscan_core::{Account, ConnectionRegistration, PersistedAccount, RecordId, ScanRecord, Stored};
use uuid::Uuid;

fn next_id() -> RecordId {
    RecordId::from(Uuid::now_v7())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _)
        if e.code == ErrorCode::ConstraintViolation && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
}

impl Db {
    /// Stores a new account and assigns its id. The password must already be a
    /// recognised hash.
    pub fn insert_account(&self, account: &Account) -> Result<PersistedAccount> {
        credentials::ensure_hashed(account.password()).map_err(|_| StoreError::PlaintextPassword)?;
        let id = next_id();
        let inserted = self.conn.execute(
            "INSERT INTO accounts(account_id, username, password, role) VALUES (?,?,?,?)",
            params![id.as_str(), account.username(), account.password(), account.role()],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::UsernameTaken(account.username().to_string()).into());
            }
            Err(e) => return Err(e.into()),
        }
        info!(account_id = %id, username = account.username(), role = account.role(), "account created");
        Ok(account.clone().into_persisted(id))
    }

    /// Applies [`PersistedAccount::set_role`] to the stored account and writes
    /// the resulting role back.
    pub fn update_role(&mut self, account_id: &RecordId, role: &str) -> Result<PersistedAccount> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let sql = format!("SELECT {} FROM accounts WHERE account_id=?", AccountRow::COLUMNS);
        let Some(row) = tx.query_row(&sql, [account_id.as_str()], AccountRow::read).optional()? else {
            return Err(StoreError::not_found("account", account_id).into());
        };
        let mut account = row.into_record()?;
        account.set_role(role);
        tx.execute(
            "UPDATE accounts SET role=? WHERE account_id=?",
            params![account.role(), account_id.as_str()],
        )?;
        tx.commit()?;
        info!(%account_id, role = account.role(), "account role changed");
        Ok(account)
    }

    pub fn insert_connection(&self, registration: &ConnectionRegistration) -> Result<Stored<ConnectionRegistration>> {
        let owner = registration.account_id();
        if self.account(owner)?.is_none() {
            return Err(StoreError::not_found("account", owner).into());
        }
        let id = next_id();
        let last_scan = registration.last_scan().map(ts_text).transpose()?;
        self.conn.execute(
            "INSERT INTO connections(connection_id, account_id, encrypted_uri, alias, last_scan, created_at) VALUES (?,?,?,?,?,?)",
            params![
                id.as_str(),
                owner.as_str(),
                registration.encrypted_uri(),
                registration.alias(),
                last_scan,
                ts_text(registration.created_at())?,
            ],
        )?;
        info!(connection_id = %id, account_id = %owner, alias = registration.alias(), "connection registered");
        Ok(Stored::new(id, registration.clone()))
    }

    /// Appends a scan record and advances the registration's `last_scan` in one
    /// IMMEDIATE transaction, so concurrent writers on the same registration
    /// serialize and `last_scan` never moves backwards.
    pub fn record_scan(&mut self, record: &ScanRecord) -> Result<Stored<ScanRecord>> {
        let connection_id = record.registration_id();
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let sql = format!("SELECT {} FROM connections WHERE connection_id=?", ConnectionRow::COLUMNS);
        let Some(row) = tx.query_row(&sql, [connection_id.as_str()], ConnectionRow::read).optional()? else {
            return Err(StoreError::not_found("connection", connection_id).into());
        };
        let mut registration = row.into_record()?.record;

        let id = next_id();
        let recorded_at = ts_text(record.timestamp())?;
        tx.execute(
            "INSERT INTO scan_records(scan_id, connection_id, findings_json, finding_count, recorded_at) VALUES (?,?,?,?,?)",
            params![
                id.as_str(),
                connection_id.as_str(),
                serde_json::to_string(record.findings())?,
                record.findings().len() as i64,
                recorded_at,
            ],
        )?;

        if registration.mark_scanned(record.timestamp()) {
            tx.execute(
                "UPDATE connections SET last_scan=? WHERE connection_id=?",
                params![recorded_at, connection_id.as_str()],
            )?;
        } else {
            debug!(%connection_id, "scan older than last_scan; last_scan left as is");
        }
        tx.commit()?;

        info!(scan_id = %id, %connection_id, findings = record.findings().len(), "scan recorded");
        Ok(Stored::new(id, record.clone()))
    }
}
