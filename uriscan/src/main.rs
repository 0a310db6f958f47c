use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use store_sqlite::{export_findings_parquet, Db};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uriscan_core::{Account, ConnectionRegistration, PersistedAccount, RecordId, ScanRecord, ScanRequest, Stored};

mod config;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Text, Json, Jsonl }

impl OutputFormat {
    fn resolve(flag: Option<Self>, cfg: &config::Config) -> Self {
        flag.or_else(|| match cfg.output.format.as_deref() {
            Some("json") => Some(OutputFormat::Json),
            Some("jsonl") => Some(OutputFormat::Jsonl),
            Some("text") => Some(OutputFormat::Text),
            _ => None,
        })
        .unwrap_or(OutputFormat::Text)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum PayloadKind { Account, Connection, Scan, Request }

#[derive(Debug, Subcommand)]
enum AccountCmd {
    /// Create an account. The password must already be hashed (bcrypt, argon2, ...)
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password_hash: String,
        /// Role; defaults to accounts.default_role from config, else "user"
        #[arg(long)]
        role: Option<String>,
    },
    /// Show an account profile (never the password)
    Show { username: String },
    /// Change an account's role
    SetRole { username: String, role: String },
}

#[derive(Debug, Subcommand)]
enum UriCmd {
    /// Register an already-encrypted connection string for an account
    Register {
        /// Owning account id
        #[arg(long)]
        account: String,
        /// Ciphertext produced by the encryption service
        #[arg(long)]
        encrypted: String,
        #[arg(long)]
        alias: Option<String>,
    },
    /// List an account's registered connection strings
    List {
        #[arg(long)]
        account: String,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Debug, Subcommand)]
enum ScanCmd {
    /// Append a scan result to a registration's history
    Record {
        #[arg(long)]
        connection: String,
        /// A finding (repeatable). None at all records a clean scan.
        #[arg(long = "finding")]
        findings: Vec<String>,
        /// File with newline-delimited findings (comments with # and blanks ignored)
        #[arg(long, value_name = "FILE")]
        findings_file: Option<PathBuf>,
    },
    /// Show a registration's scan history, oldest first
    History {
        #[arg(long)]
        connection: String,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Output file (overwrites)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Write CSV instead of text/json (needs --out)
        #[arg(long, default_value_t = false, requires = "out")]
        csv: bool,
    },
}

#[derive(Debug, Parser)]
#[command(name = "uriscan", version, about = "Encrypted connection-string registry and scan history")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./uriscan.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite store path. Default: store.path from config, else ./uriscan.db
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Account management
    Account {
        #[command(subcommand)]
        cmd: AccountCmd,
    },
    /// Registered connection strings
    Uri {
        #[command(subcommand)]
        cmd: UriCmd,
    },
    /// Scan results
    Scan {
        #[command(subcommand)]
        cmd: ScanCmd,
    },
    /// Export findings to Parquet, one row per finding
    Export {
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
        /// Only this registration's findings
        #[arg(long)]
        connection: Option<String>,
    },
    /// Validate a JSON payload and print its normalized form
    Validate {
        #[arg(value_enum)]
        kind: PayloadKind,
        file: PathBuf,
    },
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}

fn fmt_ts(at: OffsetDateTime) -> Result<String> {
    Ok(at.format(&Rfc3339)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn parse_id(raw: &str) -> Result<RecordId> {
    raw.parse::<RecordId>().with_context(|| format!("invalid id `{raw}`"))
}

fn account_by_name(db: &Db, username: &str) -> Result<PersistedAccount> {
    db.account_by_username(username)?
        .ok_or_else(|| anyhow!("account `{username}` not found"))
}

fn read_findings(path: &Path) -> Result<Vec<String>> {
    let s = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn open_output(out: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match out {
        Some(path) => {
            let file = OpenOptions::new().create(true).truncate(true).write(true).open(path)?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    })
}

fn write_connections(w: &mut dyn Write, items: &[Stored<ConnectionRegistration>], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if items.is_empty() {
                writeln!(w, "no registered connection strings")?;
            }
            for c in items {
                let last = c.record.last_scan().map(fmt_ts).transpose()?.unwrap_or_else(|| "never".to_string());
                writeln!(
                    w,
                    "{}  {}  last scan: {}  created: {}",
                    c.id,
                    c.record.alias().unwrap_or("-"),
                    last,
                    fmt_ts(c.record.created_at())?
                )?;
            }
        }
        OutputFormat::Json => writeln!(w, "{}", serde_json::to_string(items)?)?,
        OutputFormat::Jsonl => {
            for c in items {
                writeln!(w, "{}", serde_json::to_string(c)?)?;
            }
        }
    }
    Ok(())
}

fn write_history(w: &mut dyn Write, history: &[Stored<ScanRecord>], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if history.is_empty() {
                writeln!(w, "no scans recorded")?;
            }
            for s in history {
                let n = s.record.findings().len();
                writeln!(w, "{}  {}  {} finding(s)", fmt_ts(s.record.timestamp())?, s.id, n)?;
                for f in s.record.findings() {
                    writeln!(w, "    - {f}")?;
                }
            }
        }
        OutputFormat::Json => writeln!(w, "{}", serde_json::to_string(history)?)?,
        OutputFormat::Jsonl => {
            for s in history {
                writeln!(w, "{}", serde_json::to_string(s)?)?;
            }
        }
    }
    Ok(())
}

fn write_history_csv(path: &Path, history: &[Stored<ScanRecord>]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::fs::File::create(path)?);
    wtr.write_record(["scan_id", "registration_id", "timestamp", "finding_count", "findings"])?;
    for s in history {
        let timestamp = fmt_ts(s.record.timestamp())?;
        let count = s.record.findings().len().to_string();
        // JSON array so findings containing separators stay distinct.
        let findings = serde_json::to_string(s.record.findings())?;
        wtr.write_record([
            s.id.as_str(),
            s.record.registration_id().as_str(),
            timestamp.as_str(),
            count.as_str(),
            findings.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Parses `text` as the given payload kind and returns its normalized JSON.
fn validate_payload(kind: PayloadKind, text: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(text).context("payload is not valid JSON")?;
    Ok(match kind {
        PayloadKind::Account => serde_json::to_string(&Account::try_from(value)?)?,
        PayloadKind::Connection => serde_json::to_string(&ConnectionRegistration::try_from(value)?)?,
        PayloadKind::Scan => serde_json::to_string(&ScanRecord::try_from(value)?)?,
        PayloadKind::Request => {
            let request = ScanRequest::try_from(value)?;
            serde_json::to_string(&serde_json::json!({ "uri": request.redacted() }))?
        }
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;
    init_logging(&cfg.log_level(cli.log_level.as_deref()))?;

    if let Commands::Version = cli.command {
        println!("uriscan {} (core {})", env!("CARGO_PKG_VERSION"), uriscan_core::version());
        return Ok(());
    }
    if let Commands::Validate { kind, file } = &cli.command {
        let text = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
        println!("{}", validate_payload(*kind, &text)?);
        return Ok(());
    }

    let db_path = cfg.db_path(cli.db.as_deref());
    debug!(path = %db_path.display(), "opening store");
    let mut db = Db::open_or_create(&db_path)?;

    match cli.command {
        Commands::Version | Commands::Validate { .. } => {}
        Commands::Account { cmd } => match cmd {
            AccountCmd::Add { username, password_hash, role } => {
                let role = role.or_else(|| cfg.accounts.default_role.clone());
                let account = Account::new(username, password_hash, role)?;
                let stored = db.insert_account(&account)?;
                print_json(&stored.profile())?;
            }
            AccountCmd::Show { username } => {
                print_json(&account_by_name(&db, &username)?.profile())?;
            }
            AccountCmd::SetRole { username, role } => {
                let account = account_by_name(&db, &username)?;
                let id = account.id().ok_or_else(|| anyhow!("account `{username}` has no id"))?;
                print_json(&db.update_role(id, &role)?.profile())?;
            }
        },
        Commands::Uri { cmd } => match cmd {
            UriCmd::Register { account, encrypted, alias } => {
                let registration = ConnectionRegistration::new(parse_id(&account)?, encrypted, alias)?;
                print_json(&db.insert_connection(&registration)?)?;
            }
            UriCmd::List { account, format } => {
                let items = db.connections_for_account(&parse_id(&account)?)?;
                let mut w = open_output(None)?;
                write_connections(&mut w, &items, OutputFormat::resolve(format, &cfg))?;
                w.flush()?;
            }
        },
        Commands::Scan { cmd } => match cmd {
            ScanCmd::Record { connection, mut findings, findings_file } => {
                if let Some(path) = findings_file {
                    findings.extend(read_findings(&path)?);
                }
                let record = ScanRecord::new(parse_id(&connection)?, findings)?;
                print_json(&db.record_scan(&record)?)?;
            }
            ScanCmd::History { connection, format, out, csv } => {
                let id = parse_id(&connection)?;
                if db.connection(&id)?.is_none() {
                    return Err(anyhow!("connection `{id}` not found"));
                }
                let history = db.scan_history(&id)?;
                if csv {
                    let path = out.as_deref().ok_or_else(|| anyhow!("--csv requires --out <file>"))?;
                    write_history_csv(path, &history)?;
                    info!(rows = history.len(), path = %path.display(), "history written");
                    return Ok(());
                }
                let mut w = open_output(out.as_deref())?;
                write_history(&mut w, &history, OutputFormat::resolve(format, &cfg))?;
                w.flush()?;
            }
        },
        Commands::Export { out, connection } => {
            let id = connection.as_deref().map(parse_id).transpose()?;
            let rows = export_findings_parquet(&db.conn, id.as_ref(), &out)?;
            println!("{} finding(s) written to {}", rows, out.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_history() -> Vec<Stored<ScanRecord>> {
        let record = ScanRecord::try_from(json!({
            "registration_id": "c1",
            "findings": ["open to 0.0.0.0/0", "default admin"],
            "timestamp": "2024-05-01T10:00:00Z",
        }))
        .unwrap();
        vec![Stored::new(RecordId::try_from("s1").unwrap(), record)]
    }

    #[test]
    fn cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "uriscan", "--db", "x.db", "scan", "record", "--connection", "c1", "--finding", "a", "--finding", "b",
        ])
        .unwrap();
        assert_eq!(cli.db.as_deref(), Some(Path::new("x.db")));
        match cli.command {
            Commands::Scan { cmd: ScanCmd::Record { connection, findings, findings_file } } => {
                assert_eq!(connection, "c1");
                assert_eq!(findings, ["a", "b"]);
                assert!(findings_file.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn output_format_falls_back_to_config() {
        let mut cfg = config::Config::default();
        assert_eq!(OutputFormat::resolve(None, &cfg), OutputFormat::Text);
        cfg.output.format = Some("jsonl".into());
        assert_eq!(OutputFormat::resolve(None, &cfg), OutputFormat::Jsonl);
        assert_eq!(OutputFormat::resolve(Some(OutputFormat::Json), &cfg), OutputFormat::Json);
    }

    #[test]
    fn history_text_lists_findings() {
        let mut buf = Vec::new();
        write_history(&mut buf, &sample_history(), OutputFormat::Text).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("2024-05-01T10:00:00Z  s1  2 finding(s)"));
        assert!(text.contains("    - default admin"));
    }

    #[test]
    fn history_jsonl_is_one_object_per_line() {
        let mut buf = Vec::new();
        write_history(&mut buf, &sample_history(), OutputFormat::Jsonl).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let line: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(line["id"], json!("s1"));
        assert_eq!(line["registration_id"], json!("c1"));
        assert_eq!(line["timestamp"], json!("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn history_csv_keeps_findings_distinct() {
        let record = ScanRecord::try_from(json!({
            "registration_id": "c1",
            "findings": ["port 27017 | no auth", "default admin"],
            "timestamp": "2024-05-01T10:00:00Z",
        }))
        .unwrap();
        let history = vec![Stored::new(RecordId::try_from("s1").unwrap(), record)];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.csv");
        write_history_csv(&path, &history).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "s1");
        assert_eq!(&row[2], "2024-05-01T10:00:00Z");
        assert_eq!(&row[3], "2");
        let findings: Vec<String> = serde_json::from_str(&row[4]).unwrap();
        assert_eq!(findings, ["port 27017 | no auth", "default admin"]);
    }

    #[test]
    fn csv_history_needs_an_output_file() {
        let err = Cli::try_parse_from(["uriscan", "scan", "history", "--connection", "c1", "--csv"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert!(Cli::try_parse_from(["uriscan", "scan", "history", "--connection", "c1", "--csv", "--out", "h.csv"]).is_ok());
    }

    #[test]
    fn findings_file_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "# header\n\nweak password policy\n  no TLS  \n").unwrap();
        assert_eq!(read_findings(&path).unwrap(), ["weak password policy", "no TLS"]);
    }

    #[test]
    fn validate_normalizes_and_rejects() {
        let out = validate_payload(PayloadKind::Account, r#"{"username":"alice","password":"hash123"}"#).unwrap();
        assert_eq!(out, r#"{"username":"alice","password":"hash123","role":"user"}"#);

        let err = validate_payload(PayloadKind::Account, r#"{"username":"alice"}"#).unwrap_err();
        assert!(err.to_string().contains("`password` is required"));

        let out = validate_payload(PayloadKind::Request, r#"{"mongodb_uri":"mongodb://root:s3cret@db:27017"}"#).unwrap();
        assert!(!out.contains("s3cret"));
    }
}
