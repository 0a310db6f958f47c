//! Recognises stored password-hash formats so clear-text passwords can be
//! refused before they reach storage.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Bcrypt,
    Argon2,
    Scrypt,
    Pbkdf2,
    Md5Crypt,
    Apr1,
    Sha256Crypt,
    Sha512Crypt,
    Ssha,
    HexMd5,
    HexSha1,
    HexSha256,
    HexSha512,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("password is not in a recognised hashed form")]
    NotHashed,
}

// Modular crypt format prefixes. Salts and digests are not checked beyond
// requiring some payload after the identifier.
static MODULAR_CRYPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$(2[abxy]|argon2(?:id|i|d)|scrypt|pbkdf2(?:-sha(?:1|256|512))?|apr1|1|5|6)\$\S+$")
        .expect("static pattern")
});

pub fn detect_hash(s: &str) -> HashKind {
    let t = s.trim();
    if let Some(caps) = MODULAR_CRYPT.captures(t) {
        let id = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        return match id {
            "2a" | "2b" | "2x" | "2y" => HashKind::Bcrypt,
            "apr1" => HashKind::Apr1,
            "1" => HashKind::Md5Crypt,
            "5" => HashKind::Sha256Crypt,
            "6" => HashKind::Sha512Crypt,
            "scrypt" => HashKind::Scrypt,
            _ if id.starts_with("argon2") => HashKind::Argon2,
            _ => HashKind::Pbkdf2,
        };
    }
    if t.len() > "{SSHA}".len() && t.starts_with("{SSHA}") {
        return HashKind::Ssha;
    }
    if !t.is_empty() && t.chars().all(|c| c.is_ascii_hexdigit()) {
        return match t.len() {
            32 => HashKind::HexMd5,
            40 => HashKind::HexSha1,
            64 => HashKind::HexSha256,
            128 => HashKind::HexSha512,
            _ => HashKind::Unknown,
        };
    }
    HashKind::Unknown
}

pub fn is_stored_hash(s: &str) -> bool {
    detect_hash(s) != HashKind::Unknown
}

/// Accepts `password` only when it already looks like a stored hash. Unlike
/// [`detect_hash`] nothing is trimmed: the value checked is the value stored.
pub fn ensure_hashed(password: &str) -> Result<HashKind, CredentialError> {
    if password.trim() != password {
        return Err(CredentialError::NotHashed);
    }
    match detect_hash(password) {
        HashKind::Unknown => Err(CredentialError::NotHashed),
        kind => Ok(kind),
    }
}
