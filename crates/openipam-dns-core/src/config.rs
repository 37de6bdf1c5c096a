//! Configuration types for the authenticator
//!
//! - [`Credentials`]: API token and endpoint, loaded once from the INI file
//!   passed with `--dns-openipam-credentials`
//! - [`ManagerConfig`]: timing knobs of the record manager

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Default OpenIPAM API base URL
pub const DEFAULT_API_ENDPOINT: &str = "https://openipam.usu.edu/api/";

/// Default propagation wait (seconds)
pub const DEFAULT_PROPAGATION_SECONDS: u64 = 180;

/// INI key holding the API token
pub const API_TOKEN_KEY: &str = "dns_openipam_api_token";

/// INI key holding the API endpoint
pub const API_ENDPOINT_KEY: &str = "dns_openipam_api_endpoint";

/// OpenIPAM API credentials
///
/// Read-only for the lifetime of the process. The Debug implementation does
/// not expose the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL
    api_endpoint: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"<REDACTED>")
            .field("api_endpoint", &self.api_endpoint)
            .finish()
    }
}

impl Credentials {
    /// Build credentials from explicit values
    ///
    /// `api_endpoint` falls back to [`DEFAULT_API_ENDPOINT`].
    pub fn new(api_token: impl Into<String>, api_endpoint: Option<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config(format!("{} is required", API_TOKEN_KEY)));
        }

        let api_endpoint = api_endpoint
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        if !api_endpoint.starts_with("https://") && !api_endpoint.starts_with("http://") {
            return Err(Error::config(format!(
                "{} must use HTTP or HTTPS scheme. Got: {}",
                API_ENDPOINT_KEY, api_endpoint
            )));
        }

        Ok(Self {
            api_token,
            api_endpoint,
        })
    }

    /// Load credentials from an INI file
    ///
    /// Logs a warning when group or other users can access the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read credentials file '{}': {}",
                path.display(),
                e
            ))
        })?;

        check_permissions(path);

        let credentials = Self::parse(&content).map_err(|e| match e {
            Error::Config(msg) => Error::config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;

        debug!(path = %path.display(), endpoint = %credentials.api_endpoint, "Loaded OpenIPAM credentials");
        Ok(credentials)
    }

    /// Parse the INI text of a credentials file
    ///
    /// Blank lines, `#`/`;` comments and `[section]` headers are ignored.
    /// Both `=` and `:` separate keys from values; matching surrounding
    /// quotes are stripped from values.
    pub fn parse(content: &str) -> Result<Self> {
        let mut api_token = None;
        let mut api_endpoint = None;

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }

            let Some(split) = line.find(['=', ':']) else {
                return Err(Error::config(format!(
                    "line {}: expected 'key = value'",
                    index + 1
                )));
            };

            let key = line[..split].trim();
            let value = unquote(line[split + 1..].trim());

            match key {
                API_TOKEN_KEY => api_token = Some(value.to_string()),
                API_ENDPOINT_KEY => api_endpoint = Some(value.to_string()),
                other => debug!(key = other, "Ignoring unknown credentials key"),
            }
        }

        let api_token = api_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::config(format!("{} is required", API_TOKEN_KEY)))?;

        Self::new(api_token, api_endpoint)
    }

    /// The API token
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// The API base URL
    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Warn when group or other users can access the credentials file
///
/// Returns the offending permission bits, if any.
#[cfg(unix)]
fn check_permissions(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path).ok()?.permissions().mode() & 0o777;
    if mode & 0o077 == 0 {
        return None;
    }

    warn!(
        mode = format!("{:o}", mode),
        "Unsafe permissions on credentials configuration file: {}",
        path.display()
    );
    Some(mode)
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Option<u32> {
    None
}

/// Record manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Seconds to wait after creating records before reporting readiness
    ///
    /// Larger values trade latency for reliability against slow secondary
    /// nameservers.
    #[serde(default = "default_propagation_seconds")]
    pub propagation_seconds: u64,

    /// TTL of created TXT records (seconds)
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Upper bound for each remote API call (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Capacity of the lifecycle event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ManagerConfig {
    /// Create a configuration with defaults and the given propagation wait
    pub fn with_propagation_seconds(propagation_seconds: u64) -> Self {
        Self {
            propagation_seconds,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ttl == 0 {
            return Err(Error::config("Record TTL must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::config("Request timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Propagation wait as a [`Duration`]
    pub fn propagation(&self) -> Duration {
        Duration::from_secs(self.propagation_seconds)
    }

    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            propagation_seconds: default_propagation_seconds(),
            ttl: default_ttl(),
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_propagation_seconds() -> u64 {
    DEFAULT_PROPAGATION_SECONDS
}

fn default_ttl() -> u32 {
    300
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    64
}
