//! Request/response interceptors applied around every call a service makes.
//!
//! Interceptors form a chain: each receives the outgoing request plus a
//! [`Next`] that runs the rest of the chain and finally the transport.

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Request, Response,
};
use tracing::{debug, info, warn};

use crate::registry::RegistryError;

#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, request: Request, next: Next<'_>) -> reqwest::Result<Response>;
}

pub type SharedInterceptor = Arc<dyn Interceptor>;

#[derive(Clone, Copy)]
pub struct Next<'a> {
    client: &'a Client,
    chain: &'a [SharedInterceptor],
}

impl<'a> Next<'a> {
    pub(crate) fn new(client: &'a Client, chain: &'a [SharedInterceptor]) -> Self {
        Self { client, chain }
    }

    pub async fn run(self, request: Request) -> reqwest::Result<Response> {
        match self.chain.split_first() {
            Some((head, rest)) => {
                head.intercept(request, Next::new(self.client, rest))
                    .await
            }
            None => self.client.execute(request).await,
        }
    }
}

/// Adds a fixed header set to requests that do not already carry those headers.
#[derive(Debug, Clone)]
pub struct HeaderInterceptor {
    headers: HeaderMap,
}

impl HeaderInterceptor {
    pub fn new(headers: &BTreeMap<String, String>) -> Result<Self, RegistryError> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let (name, value) = parse_header(name, value)?;
            map.insert(name, value);
        }
        Ok(Self { headers: map })
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

pub(crate) fn parse_header(
    name: &str,
    value: &str,
) -> Result<(HeaderName, HeaderValue), RegistryError> {
    let invalid = || RegistryError::InvalidHeader {
        name: name.to_string(),
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    Ok((header_name, header_value))
}

#[async_trait]
impl Interceptor for HeaderInterceptor {
    async fn intercept(&self, mut request: Request, next: Next<'_>) -> reqwest::Result<Response> {
        let headers = request.headers_mut();
        for (name, value) in &self.headers {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        next.run(request).await
    }
}

/// Diagnostic interceptor the registry always installs last.
///
/// Logs the request line and the response status with latency. Bodies are
/// never logged.
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, request: Request, next: Next<'_>) -> reqwest::Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        info!(target: "Request", %method, %url, "-->");
        debug!(target: "Request", headers = ?request.headers(), "request headers");

        let started = Instant::now();
        match next.run(request).await {
            Ok(response) => {
                info!(
                    target: "Response",
                    %method,
                    %url,
                    status = response.status().as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "<--"
                );
                Ok(response)
            }
            Err(err) => {
                warn!(
                    target: "Response",
                    %method,
                    %url,
                    timeout = err.is_timeout(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "<-- failed: {err}"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/interceptor_tests.rs"]
mod tests;
