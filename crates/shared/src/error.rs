use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A non-2xx answer from a remote API. The body text is the message shown to
/// the user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}
