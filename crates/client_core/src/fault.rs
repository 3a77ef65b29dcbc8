//! Maps faults raised inside an operation to a typed [`Failure`].

use std::io;

use shared::error::Failure;

/// Timeouts map to the fixed timeout failure; anything else keeps its own message.
pub fn map_fault(err: &anyhow::Error) -> Failure {
    if is_timeout(err) {
        return Failure::timeout();
    }
    Failure::unknown(Some(err.to_string()))
}

pub fn is_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(err) = cause.downcast_ref::<reqwest::Error>() {
            return err.is_timeout();
        }
        if let Some(err) = cause.downcast_ref::<io::Error>() {
            return err.kind() == io::ErrorKind::TimedOut;
        }
        cause.is::<tokio::time::error::Elapsed>()
    })
}

/// Connection, request-send and body-read failures, as opposed to decode or status errors.
pub fn is_transport(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(err) = cause.downcast_ref::<reqwest::Error>() {
            return err.is_connect() || err.is_timeout() || err.is_request() || err.is_body();
        }
        cause.is::<io::Error>() || cause.is::<tokio::time::error::Elapsed>()
    })
}

/// A response that arrived with a non-success HTTP status.
pub fn is_status(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(reqwest::Error::is_status)
}

#[cfg(test)]
#[path = "tests/fault_tests.rs"]
mod tests;
