use chrono::NaiveDate;
use ulid::Ulid;

use crate::store::StoreError;

#[derive(Debug)]
pub enum EngineError {
    /// Missing or malformed input; the message names the offending field.
    ValidationFailed(String),
    /// Recurring request with an unusable rule (e.g. empty weekday set).
    InvalidRecurrence(&'static str),
    /// Approval-path overlap with an existing approved booking.
    Conflict { date: NaiveDate },
    NotFound(Ulid),
    AuthorizationDenied(String),
    Store(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            EngineError::InvalidRecurrence(msg) => write!(f, "invalid recurrence: {msg}"),
            EngineError::Conflict { date } => {
                write!(f, "conflicts with an approved reservation on {date}")
            }
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AuthorizationDenied(msg) => write!(f, "authorization denied: {msg}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e.0)
    }
}
