//! File and environment configuration for [`FetchOptions`].

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::data::FetchOptions;
use crate::error::{FetchError, Result};

pub const ENV_CONNECT_TIMEOUT_SECS: &str = "TROVE_CONNECT_TIMEOUT_SECS";
pub const ENV_READ_TIMEOUT_SECS: &str = "TROVE_READ_TIMEOUT_SECS";
pub const ENV_CHUNK_SIZE: &str = "TROVE_CHUNK_SIZE";
pub const ENV_CA_BUNDLE: &str = "TROVE_CA_BUNDLE";
pub const ENV_STAGING_DIR: &str = "TROVE_STAGING_DIR";

/// The `[fetch]` table of an updater configuration file.
///
/// Every field is optional; unset fields keep the [`FetchOptions`] defaults.
///
/// ```toml
/// [fetch]
/// connect_timeout_secs = 10
/// read_timeout_secs = 20
/// ca_bundle = "/etc/updater/mirrors-ca.pem"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub connect_timeout_secs:  Option<u64>,
    pub read_timeout_secs:     Option<u64>,
    pub chunk_size:            Option<usize>,
    pub max_redirects:         Option<usize>,
    pub user_agent:            Option<String>,
    pub ca_bundle:             Option<PathBuf>,
    pub builtin_roots:         Option<bool>,
    pub system_proxy:          Option<bool>,
    pub staging_dir:           Option<PathBuf>,
    pub min_average_speed:     Option<u64>,
    pub slow_start_grace_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    fetch: FetchConfig,
}

impl FetchConfig {
    /// Parse the `[fetch]` table out of a TOML document. Other tables are ignored.
    pub fn from_toml(document: &str) -> Result<Self> {
        let document: ConfigDocument = toml::from_str(document)
            .map_err(|e| FetchError::Config(format!("invalid fetch configuration: {e}")))?;
        Ok(document.fetch)
    }

    /// Read the `TROVE_*` environment variables.
    pub fn from_env() -> Result<Self> { Self::from_lookup(|key| std::env::var(key).ok()) }

    /// Like [`from_env`](Self::from_env), reading values through `lookup`.
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            connect_timeout_secs: get(ENV_CONNECT_TIMEOUT_SECS)
                .map(|v| parse_number(ENV_CONNECT_TIMEOUT_SECS, &v))
                .transpose()?,
            read_timeout_secs: get(ENV_READ_TIMEOUT_SECS)
                .map(|v| parse_number(ENV_READ_TIMEOUT_SECS, &v))
                .transpose()?,
            chunk_size: get(ENV_CHUNK_SIZE)
                .map(|v| parse_number(ENV_CHUNK_SIZE, &v))
                .transpose()?,
            ca_bundle: get(ENV_CA_BUNDLE).map(PathBuf::from),
            staging_dir: get(ENV_STAGING_DIR).map(PathBuf::from),
            ..Self::default()
        })
    }

    /// Layer `other` on top of `self`: fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: FetchConfig) -> Self {
        Self {
            connect_timeout_secs:  other.connect_timeout_secs.or(self.connect_timeout_secs),
            read_timeout_secs:     other.read_timeout_secs.or(self.read_timeout_secs),
            chunk_size:            other.chunk_size.or(self.chunk_size),
            max_redirects:         other.max_redirects.or(self.max_redirects),
            user_agent:            other.user_agent.or(self.user_agent),
            ca_bundle:             other.ca_bundle.or(self.ca_bundle),
            builtin_roots:         other.builtin_roots.or(self.builtin_roots),
            system_proxy:          other.system_proxy.or(self.system_proxy),
            staging_dir:           other.staging_dir.or(self.staging_dir),
            min_average_speed:     other.min_average_speed.or(self.min_average_speed),
            slow_start_grace_secs: other.slow_start_grace_secs.or(self.slow_start_grace_secs),
        }
    }

    /// Build validated options. A configured CA bundle is read here.
    pub fn into_options(self) -> Result<FetchOptions> {
        let mut options = FetchOptions::default();

        if let Some(secs) = self.connect_timeout_secs {
            options = options.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.read_timeout_secs {
            options = options.read_timeout(Duration::from_secs(secs));
        }
        if let Some(chunk_size) = self.chunk_size {
            options = options.chunk_size(chunk_size);
        }
        if let Some(max_redirects) = self.max_redirects {
            options = options.max_redirects(max_redirects);
        }
        if let Some(user_agent) = self.user_agent {
            options = options.user_agent(user_agent);
        }
        if let Some(path) = self.ca_bundle {
            debug!("loading CA bundle from {}", path.display());
            let pem = std::fs::read(&path).map_err(|e| {
                FetchError::Config(format!("cannot read CA bundle {}: {e}", path.display()))
            })?;
            options = options.add_root_certificate(pem);
        }
        if let Some(enabled) = self.builtin_roots {
            options = options.builtin_roots(enabled);
        }
        if let Some(enabled) = self.system_proxy {
            options = options.system_proxy(enabled);
        }
        if let Some(dir) = self.staging_dir {
            options = options.staging_dir(dir);
        }
        options = options.min_average_speed(self.min_average_speed);
        if let Some(secs) = self.slow_start_grace_secs {
            options = options.slow_start_grace(Duration::from_secs(secs));
        }

        options.validate()?;
        Ok(options)
    }
}

impl FetchOptions {
    /// Defaults overridden by the `TROVE_*` environment variables.
    pub fn from_env() -> Result<Self> { FetchConfig::from_env()?.into_options() }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| FetchError::Config(format!("{key} must be a non-negative integer, got {value:?}")))
}
