use std::{fmt, sync::Arc};

use anyhow::{Context, Result};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::interceptor::{Next, SharedInterceptor};

/// A remote interface built once by the registry and shared afterwards.
pub trait RemoteService: Send + Sync + 'static {
    fn from_http(http: HttpService) -> Self;
}

/// Configured transport handed to a [`RemoteService`]: one client, one base
/// address and the interceptor chain every call passes through.
#[derive(Clone)]
pub struct HttpService {
    inner: Arc<HttpServiceInner>,
}

struct HttpServiceInner {
    client: Client,
    base_url: Url,
    interceptors: Vec<SharedInterceptor>,
}

impl fmt::Debug for HttpService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpService")
            .field("base_url", &self.inner.base_url.as_str())
            .field("interceptors", &self.inner.interceptors.len())
            .finish()
    }
}

impl HttpService {
    pub(crate) fn new(client: Client, base_url: Url, interceptors: Vec<SharedInterceptor>) -> Self {
        Self {
            inner: Arc::new(HttpServiceInner {
                client,
                base_url,
                interceptors,
            }),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn interceptor_count(&self) -> usize {
        self.inner.interceptors.len()
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("invalid endpoint path '{path}'"))
    }

    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.inner.client.request(method, self.endpoint(path)?))
    }

    /// Sends `request` through the interceptor chain.
    pub async fn send(&self, request: Request) -> reqwest::Result<Response> {
        Next::new(&self.inner.client, &self.inner.interceptors)
            .run(request)
            .await
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let request = self.request(Method::GET, path)?.build()?;
        self.send_json(request).await
    }

    pub async fn get_json_with_query<Q, R>(&self, path: &str, query: &Q) -> Result<R>
    where
        Q: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.request(Method::GET, path)?.query(query).build()?;
        self.send_json(request).await
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.request(Method::POST, path)?.json(body).build()?;
        self.send_json(request).await
    }

    async fn send_json<R: DeserializeOwned>(&self, request: Request) -> Result<R> {
        let url = request.url().clone();
        let response = self.send(request).await?.error_for_status()?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).with_context(|| format!("failed to decode response from {url}"))
    }
}
