//! Error taxonomy for the referral tracker core.
//!
//! Every fallible core operation returns [`ReferResult`]. The variants map onto the
//! boundary behaviour the API layer needs: validation failures surface to the initiating
//! user with no state change, authorization failures become access-denied responses,
//! and gateway failures are isolated per operation so one bad record never takes the
//! session down.

/// Errors produced by core services and the persistence gateway contract.
#[derive(Debug, thiserror::Error)]
pub enum ReferError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("missing required measurement: {field}")]
    MissingMeasurement { field: &'static str },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("permission denied: {0}")]
    Forbidden(String),
    #[error("invalid or expired credentials")]
    Unauthorized,
    #[error("{0}")]
    Conflict(String),
    #[error("invalid date format, expected YYYY-MM-DD")]
    InvalidDate,
    #[error("illegal status transition: appointment is {0}")]
    IllegalTransition(&'static str),
    #[error("gateway failure: {0}")]
    Gateway(String),
}

pub type ReferResult<T> = std::result::Result<T, ReferError>;

impl From<refer_types::TextError> for ReferError {
    fn from(err: refer_types::TextError) -> Self {
        ReferError::Validation(err.to_string())
    }
}
