pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE accounts (
  account_id      TEXT PRIMARY KEY,
  username        TEXT NOT NULL UNIQUE,
  password        TEXT NOT NULL,
  role            TEXT NOT NULL DEFAULT 'user'
);

CREATE TABLE connections (
  connection_id   TEXT PRIMARY KEY,
  account_id      TEXT NOT NULL REFERENCES accounts(account_id),
  encrypted_uri   TEXT NOT NULL,
  alias           TEXT,
  last_scan       TEXT,
  created_at      TEXT NOT NULL
);

CREATE TABLE scan_records (
  scan_id         TEXT PRIMARY KEY,
  connection_id   TEXT NOT NULL REFERENCES connections(connection_id),
  findings_json   TEXT NOT NULL,
  finding_count   INTEGER NOT NULL CHECK (finding_count >= 0),
  recorded_at     TEXT NOT NULL
);

CREATE TRIGGER scan_records_no_update BEFORE UPDATE ON scan_records
BEGIN
  SELECT RAISE(ABORT, 'scan records are append-only');
END;

CREATE TRIGGER scan_records_no_delete BEFORE DELETE ON scan_records
BEGIN
  SELECT RAISE(ABORT, 'scan records are append-only');
END;

CREATE INDEX idx_connections_account ON connections(account_id);
CREATE INDEX idx_scans_connection ON scan_records(connection_id);

COMMIT;
"#
;
