use crate::fields::{non_blank, Fields};
use crate::ValidationError;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use url::Url;

const MASK: &str = "****";
const SENSITIVE_PARAMS: &[&str] = &["pass", "pwd", "secret", "token", "key"];

/// A plaintext connection string submitted for one immediate scan.
///
/// Deliberately not `Serialize`: nothing serde-based can persist it. `Debug` and
/// `Display` print the redacted form.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub struct ScanRequest {
    uri: String,
}

impl ScanRequest {
    pub fn new(uri: impl Into<String>) -> Result<Self, ValidationError> {
        let uri = non_blank("uri", uri.into())?;
        Ok(ScanRequest { uri: uri.trim().to_string() })
    }

    /// The raw connection string, for handing to a scanner or cipher only.
    pub fn expose_uri(&self) -> &str {
        &self.uri
    }

    pub fn redacted(&self) -> String {
        redact_uri(&self.uri)
    }
}

impl TryFrom<Value> for ScanRequest {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let f = Fields::of(&value)?;
        ScanRequest::new(f.text("uri", &["mongodb_uri"])?)
    }
}

impl fmt::Debug for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanRequest").field("uri", &self.redacted()).finish()
    }
}

impl fmt::Display for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Connection string safe for logs: the password and credential-like query
/// parameters are masked. A username with no password is treated as a token and
/// masked too. Strings that do not parse as URLs are masked whole.
pub fn redact_uri(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return MASK.to_string();
    };
    let masked = if url.password().is_some() {
        url.set_password(Some(MASK))
    } else if !url.username().is_empty() {
        url.set_username(MASK)
    } else {
        Ok(())
    };
    if masked.is_err() {
        return MASK.to_string();
    }
    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let lower = k.to_ascii_lowercase();
                let hide = SENSITIVE_PARAMS.iter().any(|s| lower.contains(s));
                (k.into_owned(), if hide { MASK.to_string() } else { v.into_owned() })
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    url.to_string()
}

/// True when `value` reads as `scheme://...`, i.e. a connection string rather
/// than ciphertext. Checked on shape alone: multi-host MongoDB strings and
/// socket-path URIs do not parse as URLs or carry no host.
pub(crate) fn looks_like_connection_string(value: &str) -> bool {
    let Some((scheme, rest)) = value.trim().split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    let scheme_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    scheme_ok && !rest.is_empty()
}
