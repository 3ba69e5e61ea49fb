use thiserror::Error;

use crate::parser::data::DataError;

/// Conditions raised by the shopping flow
///
/// Only `LoginFailed`, `UnknownUser`, `CartTotalExceeded` and `Data` fail a
/// run; `SearchUnavailable` is reported and the scenario carries on.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Login failed for user {user_key}")]
    LoginFailed { user_key: String },

    #[error("no credentials for user key '{0}'")]
    UnknownUser(String),

    #[error("Cart total {total} exceeds maximum allowed {limit}")]
    CartTotalExceeded { total: f64, limit: f64 },

    #[error(transparent)]
    Data(#[from] DataError),
}

impl FlowError {
    /// Whether this condition fails the whole run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FlowError::SearchUnavailable(_))
    }
}
