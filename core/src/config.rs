//! Client configuration as plain data.
//!
//! `ClientConfig` can be deserialized from any serde format or read from the
//! `BACKSTAGE_*` environment variables.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const ENV_BASE_URL: &str = "BACKSTAGE_BASE_URL";
pub const ENV_NAMESPACE: &str = "BACKSTAGE_NAMESPACE";
pub const ENV_TOKEN: &str = "BACKSTAGE_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "BACKSTAGE_TIMEOUT_SECS";

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub namespace: Option<String>,
    pub token: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = get(ENV_BASE_URL)
            .ok_or_else(|| ApiError::Config(format!("{ENV_BASE_URL} is not set")))?;
        let timeout_secs = get(ENV_TIMEOUT_SECS)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| {
                    ApiError::Config(format!("{ENV_TIMEOUT_SECS}={raw:?} is not a number: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            base_url,
            namespace: get(ENV_NAMESPACE),
            token: get(ENV_TOKEN),
            user_agent: None,
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
