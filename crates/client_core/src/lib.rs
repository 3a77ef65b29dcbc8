//! Remote-service plumbing: the service registry, interceptors, the HTTP
//! handle services are built on, and fault classification.

use std::future::Future;

use tracing::warn;

pub mod config;
pub mod fault;
pub mod interceptor;
pub mod registry;
pub mod service;

pub use config::{load_settings, HttpSettings, SettingsError};
pub use fault::map_fault;
pub use interceptor::{HeaderInterceptor, Interceptor, LoggingInterceptor, Next, SharedInterceptor};
pub use registry::{RegistryError, ServiceRegistry, DEFAULT_TIMEOUT_SECS};
pub use service::{HttpService, RemoteService};

/// Awaits `call` in place for call sites that want its value directly.
///
/// Transport failures and error statuses are logged and reported as
/// `Ok(None)`; decode and other errors still propagate.
pub async fn execute<T, F>(call: F) -> anyhow::Result<Option<T>>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match call.await {
        Ok(value) => Ok(Some(value)),
        Err(err) if fault::is_transport(&err) || fault::is_status(&err) => {
            warn!("request failed: {err:#}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Blocking form of [`execute`] for threads outside the runtime.
///
/// # Panics
///
/// Panics if called from within an asynchronous execution context.
pub fn execute_blocking<T, F>(runtime: &tokio::runtime::Handle, call: F) -> anyhow::Result<Option<T>>
where
    F: Future<Output = anyhow::Result<T>>,
{
    runtime.block_on(execute(call))
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
