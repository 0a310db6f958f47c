use crate::models::{AccountRow, ConnectionRow, ScanRow};
use crate::Db;
use anyhow::Result;
use rusqlite::OptionalExtension;
use uriscan_core::{ConnectionRegistration, PersistedAccount, RecordId, ScanRecord, Stored};

impl Db {
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let cnt: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |r| r.get(0),
        )?;
        Ok(cnt > 0)
    }

    pub fn account(&self, id: &RecordId) -> Result<Option<PersistedAccount>> {
        self.account_where("account_id", id.as_str())
    }

    pub fn account_by_username(&self, username: &str) -> Result<Option<PersistedAccount>> {
        self.account_where("username", username)
    }

    fn account_where(&self, column: &'static str, value: &str) -> Result<Option<PersistedAccount>> {
        let sql = format!("SELECT {} FROM accounts WHERE {column}=?", AccountRow::COLUMNS);
        let row = self.conn.query_row(&sql, [value], AccountRow::read).optional()?;
        row.map(AccountRow::into_record).transpose()
    }

    pub fn connection(&self, id: &RecordId) -> Result<Option<Stored<ConnectionRegistration>>> {
        let sql = format!("SELECT {} FROM connections WHERE connection_id=?", ConnectionRow::COLUMNS);
        let row = self.conn.query_row(&sql, [id.as_str()], ConnectionRow::read).optional()?;
        row.map(ConnectionRow::into_record).transpose()
    }

    /// Registrations owned by `account_id`, oldest first.
    pub fn connections_for_account(&self, account_id: &RecordId) -> Result<Vec<Stored<ConnectionRegistration>>> {
        let sql = format!("SELECT {} FROM connections WHERE account_id=? ORDER BY rowid", ConnectionRow::COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([account_id.as_str()], ConnectionRow::read)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }

    /// Every scan recorded for a registration, in the order they were appended.
    pub fn scan_history(&self, connection_id: &RecordId) -> Result<Vec<Stored<ScanRecord>>> {
        let sql = format!("SELECT {} FROM scan_records WHERE connection_id=? ORDER BY rowid", ScanRow::COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([connection_id.as_str()], ScanRow::read)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }

    pub fn latest_scan(&self, connection_id: &RecordId) -> Result<Option<Stored<ScanRecord>>> {
        let sql = format!(
            "SELECT {} FROM scan_records WHERE connection_id=? ORDER BY rowid DESC LIMIT 1",
            ScanRow::COLUMNS
        );
        let row = self.conn.query_row(&sql, [connection_id.as_str()], ScanRow::read).optional()?;
        row.map(ScanRow::into_record).transpose()
    }
}
