use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "uriscan.yaml";
pub const DEFAULT_DB_FILE: &str = "uriscan.db";

#[derive(Debug, Default, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `store_sqlite=debug`.
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct OutputConfig {
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct AccountsConfig {
    pub default_role: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
}

impl Config {
    /// `--db` wins over `store.path`, which wins over `./uriscan.db`.
    pub fn db_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.store.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
    }

    pub fn log_level(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.log.level.clone())
            .unwrap_or_else(|| "info".to_string())
    }
}

/// Loads the given file, or `./uriscan.yaml` when present. An explicitly named
/// file that cannot be read or parsed is an error; a missing default is not.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new(DEFAULT_CONFIG_FILE);
            if p.exists() { p.to_path_buf() } else { return Ok(Config::default()); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&s).with_context(|| format!("parsing config {}", path.display()))
}

fn parse_config(s: &str) -> Result<Config> {
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(s)?)
}
