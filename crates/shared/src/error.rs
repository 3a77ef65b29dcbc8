use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code reported when a connect, read or write deadline expires.
pub const TIMEOUT: i32 = -2;
/// Code reported for every other fault, and for a missing response.
pub const UNKNOWN: i32 = -1;

pub const TIMEOUT_MESSAGE: &str = "request timed out";
pub const UNKNOWN_MESSAGE: &str = "unknown error";
pub const EMPTY_RESPONSE_MESSAGE: &str = "empty response";

/// A normalized failure handed to `on_failure` callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {}", message.as_deref().unwrap_or(UNKNOWN_MESSAGE))]
pub struct Failure {
    pub code: i32,
    pub message: Option<String>,
}

impl Failure {
    pub fn new(code: i32, message: Option<String>) -> Self {
        Self { code, message }
    }

    pub fn timeout() -> Self {
        Self::new(TIMEOUT, Some(TIMEOUT_MESSAGE.to_string()))
    }

    /// Keeps the fault's own message when it has one.
    pub fn unknown(message: Option<String>) -> Self {
        let message = message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_MESSAGE.to_string());
        Self::new(UNKNOWN, Some(message))
    }

    pub fn empty_response() -> Self {
        Self::new(UNKNOWN, Some(EMPTY_RESPONSE_MESSAGE.to_string()))
    }

    /// A business error carried by the envelope itself; passed through verbatim.
    pub fn business(code: Option<i32>, message: Option<String>) -> Self {
        Self::new(code.unwrap_or(UNKNOWN), message)
    }

    pub fn is_timeout(&self) -> bool {
        self.code == TIMEOUT
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
