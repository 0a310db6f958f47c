//! Record types for registered connection strings and their scan history.

mod account;
mod cipher;
mod connection;
mod error;
mod fields;
mod id;
mod request;
mod scan;

pub use account::{Account, AccountProfile, PersistedAccount, DEFAULT_ROLE};
pub use cipher::UriCipher;
pub use connection::ConnectionRegistration;
pub use error::ValidationError;
pub use id::{RecordId, Stored};
pub use request::{redact_uri, ScanRequest};
pub use scan::{ScanRecord, Scanner};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }
}
