use thiserror::Error;

/// Raised when a record cannot be constructed from its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("field `{0}` is required")]
    Missing(&'static str),
    #[error("field `{0}` must not be blank")]
    Blank(&'static str),
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("field `{0}` is not an RFC 3339 timestamp")]
    InvalidTimestamp(&'static str),
    #[error("field `{0}` looks like a plaintext connection string")]
    Plaintext(&'static str),
    #[error("field `{0}` is already set and cannot change")]
    Immutable(&'static str),
}
