//! Routes an operation's outcome into success/result/failure callbacks.

use std::future::Future;

use client_core::map_fault;
use futures::{stream, Stream};
use shared::{
    envelope::{resolve, resolve_page, ApiResponse, Page, PageResponse},
    error::Failure,
};

use crate::scope::{Settlement, TaskHandle, TaskScope};

pub type OnSuccess = Box<dyn FnOnce() + Send + 'static>;

/// Settles a plain response: `on_success` then `on_result` when the envelope
/// reports success, otherwise `on_failure` alone.
pub fn settle_response<R, T>(
    response: anyhow::Result<Option<R>>,
    on_success: Option<OnSuccess>,
    on_result: impl FnOnce(Option<T>) + Send + 'static,
    on_failure: impl FnOnce(Failure) + Send + 'static,
) -> Settlement
where
    R: ApiResponse<Data = T>,
    T: Send + 'static,
{
    match response.map_err(|err| map_fault(&err)).and_then(resolve) {
        Ok(data) => with_success(on_success).then(move || on_result(data)),
        Err(failure) => Settlement::failed().then(move || on_failure(failure)),
    }
}

pub fn settle_page<R, T>(
    response: anyhow::Result<Option<R>>,
    on_success: Option<OnSuccess>,
    on_failure: impl FnOnce(Failure) + Send + 'static,
    on_result: impl FnOnce(Page<T>) + Send + 'static,
) -> Settlement
where
    R: PageResponse<Item = T>,
    T: Send + 'static,
{
    match response.map_err(|err| map_fault(&err)).and_then(resolve_page) {
        Ok(page) => with_success(on_success).then(move || on_result(page)),
        Err(failure) => Settlement::failed().then(move || on_failure(failure)),
    }
}

fn with_success(on_success: Option<OnSuccess>) -> Settlement {
    match on_success {
        Some(on_success) => Settlement::succeeded().then(on_success),
        None => Settlement::succeeded(),
    }
}

impl TaskScope {
    /// Runs `operation` in this scope and dispatches its envelope.
    pub fn launch<Fut, R, T>(
        &self,
        operation: Fut,
        on_success: Option<OnSuccess>,
        on_result: impl FnOnce(Option<T>) + Send + 'static,
        on_failure: impl FnOnce(Failure) + Send + 'static,
    ) -> TaskHandle
    where
        Fut: Future<Output = anyhow::Result<Option<R>>> + Send + 'static,
        R: ApiResponse<Data = T> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(async move {
            settle_response(operation.await, on_success, on_result, on_failure)
        })
    }

    /// Like [`launch`](Self::launch) for paginated envelopes.
    pub fn page_launch<Fut, R, T>(
        &self,
        operation: Fut,
        on_success: Option<OnSuccess>,
        on_failure: impl FnOnce(Failure) + Send + 'static,
        on_result: impl FnOnce(Page<T>) + Send + 'static,
    ) -> TaskHandle
    where
        Fut: Future<Output = anyhow::Result<Option<R>>> + Send + 'static,
        R: PageResponse<Item = T> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(async move {
            settle_page(operation.await, on_success, on_failure, on_result)
        })
    }

    /// Runs a unit future in this scope with no result dispatch.
    pub fn launch_ui<Fut>(&self, operation: Fut) -> TaskHandle
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            operation.await;
            Settlement::succeeded()
        })
    }
}

/// Wraps `operation` as a lazy single-item stream. Not bound to any scope.
pub fn launch_flow<Fut: Future>(operation: Fut) -> impl Stream<Item = Fut::Output> {
    stream::once(operation)
}

#[cfg(test)]
#[path = "tests/adapter_tests.rs"]
mod tests;
