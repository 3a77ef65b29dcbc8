//! Process-wide cache of remote service clients.
//!
//! Services are keyed by their Rust type alone. The first lookup for a type
//! fixes its host, timeout and interceptors for the rest of the process; a
//! later lookup naming a different host still gets the first client.

use std::{
    any::{type_name, Any, TypeId},
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use once_cell::sync::Lazy;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::HttpSettings,
    interceptor::{parse_header, HeaderInterceptor, LoggingInterceptor, SharedInterceptor},
    service::{HttpService, RemoteService},
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

static GLOBAL: Lazy<ServiceRegistry> = Lazy::new(ServiceRegistry::new);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("default base url is not configured; call set_default_host before requesting a default service")]
    DefaultHostUnset,
    #[error("registry settings are frozen once the first service has been built")]
    Frozen,
    #[error("invalid host '{host}': {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },
    #[error("failed to build http client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

struct RegistrySettings {
    default_host: Option<String>,
    default_headers: BTreeMap<String, String>,
    timeout: Duration,
    frozen: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            default_host: None,
            default_headers: BTreeMap::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            frozen: false,
        }
    }
}

struct ServiceEntry {
    service: Arc<dyn Any + Send + Sync>,
    host: String,
}

pub struct ServiceRegistry {
    settings: Mutex<RegistrySettings>,
    services: Mutex<HashMap<TypeId, ServiceEntry>>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            settings: Mutex::new(RegistrySettings::default()),
            services: Mutex::new(HashMap::new()),
        }
    }

    pub fn global() -> &'static ServiceRegistry {
        &GLOBAL
    }

    pub fn configure(&self, settings: &HttpSettings) -> Result<(), RegistryError> {
        for (name, value) in &settings.headers {
            parse_header(name, value)?;
        }
        if let Some(host) = &settings.base_url {
            normalize_host(host)?;
        }

        let mut current = self.lock_settings();
        if current.frozen {
            return Err(RegistryError::Frozen);
        }
        if settings.base_url.is_some() {
            current.default_host = settings.base_url.clone();
        }
        current.timeout = Duration::from_secs(settings.timeout_secs);
        current.default_headers.extend(settings.headers.clone());
        debug!(
            default_host = ?current.default_host,
            timeout_secs = settings.timeout_secs,
            headers = current.default_headers.len(),
            "configured service registry"
        );
        Ok(())
    }

    pub fn set_default_host(&self, host: impl Into<String>) -> Result<(), RegistryError> {
        let host = host.into();
        normalize_host(&host)?;
        let mut settings = self.lock_settings();
        if settings.frozen {
            return Err(RegistryError::Frozen);
        }
        settings.default_host = Some(host);
        Ok(())
    }

    pub fn default_host(&self) -> Option<String> {
        self.lock_settings().default_host.clone()
    }

    pub fn add_default_header(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let (name, value) = (name.into(), value.into());
        parse_header(&name, &value)?;
        let mut settings = self.lock_settings();
        if settings.frozen {
            return Err(RegistryError::Frozen);
        }
        settings.default_headers.insert(name, value);
        Ok(())
    }

    pub fn set_default_timeout(&self, timeout: Duration) -> Result<(), RegistryError> {
        let mut settings = self.lock_settings();
        if settings.frozen {
            return Err(RegistryError::Frozen);
        }
        settings.timeout = timeout;
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        self.lock_settings().timeout
    }

    /// Returns the cached `S`, building it on first use with `host` and
    /// `interceptors` followed by the diagnostic interceptor.
    ///
    /// The cache key is `S` alone; `host` and `interceptors` only matter on the
    /// call that builds the client.
    pub fn get_service<S: RemoteService>(
        &self,
        host: &str,
        interceptors: Vec<SharedInterceptor>,
    ) -> Result<Arc<S>, RegistryError> {
        let key = TypeId::of::<S>();
        let mut services = self.lock_services();

        if let Some(entry) = services.get(&key) {
            if entry.host != host {
                warn!(
                    service = type_name::<S>(),
                    cached_host = %entry.host,
                    requested_host = %host,
                    "service already built for another host; returning cached client"
                );
            }
            return downcast::<S>(entry);
        }

        let base_url = normalize_host(host)?;
        let timeout = {
            let mut settings = self.lock_settings();
            settings.frozen = true;
            settings.timeout
        };
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        let mut chain = interceptors;
        chain.push(Arc::new(LoggingInterceptor));
        let service: Arc<S> = Arc::new(S::from_http(HttpService::new(client, base_url, chain)));

        info!(service = type_name::<S>(), %host, "built remote service");
        services.insert(
            key,
            ServiceEntry {
                service: Arc::clone(&service) as Arc<dyn Any + Send + Sync>,
                host: host.to_string(),
            },
        );
        Ok(service)
    }

    /// Looks up `S` against the default host, adding the default headers.
    pub fn get_default_service<S: RemoteService>(&self) -> Result<Arc<S>, RegistryError> {
        let (host, headers) = {
            let settings = self.lock_settings();
            let host = settings
                .default_host
                .clone()
                .ok_or(RegistryError::DefaultHostUnset)?;
            (host, settings.default_headers.clone())
        };

        let mut interceptors: Vec<SharedInterceptor> = Vec::new();
        if !headers.is_empty() {
            interceptors.push(Arc::new(HeaderInterceptor::new(&headers)?));
        }
        self.get_service::<S>(&host, interceptors)
    }

    pub fn host_of<S: RemoteService>(&self) -> Option<String> {
        self.lock_services()
            .get(&TypeId::of::<S>())
            .map(|entry| entry.host.clone())
    }

    pub fn len(&self) -> usize {
        self.lock_services().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_settings(&self) -> MutexGuard<'_, RegistrySettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_services(&self) -> MutexGuard<'_, HashMap<TypeId, ServiceEntry>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn downcast<S: RemoteService>(entry: &ServiceEntry) -> Result<Arc<S>, RegistryError> {
    match Arc::clone(&entry.service).downcast::<S>() {
        Ok(service) => Ok(service),
        Err(_) => unreachable!("registry entries are keyed by their own TypeId"),
    }
}

fn normalize_host(host: &str) -> Result<Url, RegistryError> {
    let mut url = Url::parse(host).map_err(|source| RegistryError::InvalidHost {
        host: host.to_string(),
        source,
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
