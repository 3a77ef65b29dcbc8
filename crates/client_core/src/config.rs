use std::{collections::BTreeMap, fs, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::registry::DEFAULT_TIMEOUT_SECS;

pub const SETTINGS_FILE: &str = "client.toml";
const ENV_PREFIX: &str = "APP__";
const HEADER_ENV_PREFIX: &str = "APP__HEADER_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Defaults, then `client.toml` in the working directory, then `APP__*` variables.
pub fn load_settings() -> Result<HttpSettings, SettingsError> {
    load_settings_from(Path::new(SETTINGS_FILE), std::env::vars())
}

pub fn load_settings_from(
    path: &Path,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<HttpSettings, SettingsError> {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<HttpSettings>(&raw).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => HttpSettings::default(),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };

    for (key, value) in vars {
        apply_env_override(&mut settings, &key, value)?;
    }

    Ok(settings)
}

fn apply_env_override(
    settings: &mut HttpSettings,
    key: &str,
    value: String,
) -> Result<(), SettingsError> {
    if let Some(name) = key.strip_prefix(HEADER_ENV_PREFIX) {
        if !name.is_empty() {
            settings.headers.insert(header_name_from_env(name), value);
        }
        return Ok(());
    }

    match key.strip_prefix(ENV_PREFIX) {
        Some("BASE_URL") => settings.base_url = Some(value),
        Some("TIMEOUT_SECS") => {
            settings.timeout_secs =
                value
                    .trim()
                    .parse()
                    .map_err(|_| SettingsError::InvalidValue {
                        key: key.to_string(),
                        value,
                    })?;
        }
        _ => {}
    }
    Ok(())
}

/// `APP__HEADER_X_CLIENT_VERSION` becomes `x-client-version`.
fn header_name_from_env(raw: &str) -> String {
    raw.to_ascii_lowercase().replace('_', "-")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
