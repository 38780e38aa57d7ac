use std::{path::PathBuf, time::Duration};

use medboard_reqwest::RefreshCredentialMode;
use serde::{Deserialize, Serialize};
use url::Url;

/// The backend used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";

/// The overall request timeout used when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for an [`AdminClient`][crate::AdminClient]
///
/// ```
/// use medboard::ClientConfig;
/// use medboard_reqwest::RefreshCredentialMode;
///
/// let config: ClientConfig = serde_json::from_str(r#"{
///     "base-url": "https://clinic.example.com/api",
///     "refresh-mode": "cookie"
/// }"#).unwrap();
///
/// assert_eq!(config.timeout().as_secs(), 30);
/// assert_eq!(config.refresh_mode, RefreshCredentialMode::Cookie);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    /// The base URL of the backend's REST API
    pub base_url: Url,

    /// The overall timeout for a single request
    ///
    /// Read and written as a positive number of seconds under `timeout-secs`.
    #[serde(rename = "timeout-secs", default = "default_timeout", with = "timeout_secs")]
    pub timeout: Duration,

    /// How the refresh credential is presented to the refresh endpoint
    #[serde(default)]
    pub refresh_mode: RefreshCredentialMode,

    /// A local file used to keep the session across runs
    ///
    /// Credentials are only kept in memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

mod timeout_secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if timeout.subsec_nanos() == 0 {
            serializer.serialize_u64(timeout.as_secs())
        } else {
            serializer.serialize_f64(timeout.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        match Duration::try_from_secs_f64(secs) {
            Ok(timeout) if !timeout.is_zero() => Ok(timeout),
            _ => Err(de::Error::invalid_value(
                de::Unexpected::Float(secs),
                &"a positive number of seconds",
            )),
        }
    }
}

impl ClientConfig {
    /// Constructs a configuration for the given backend with default settings
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: default_timeout(),
            refresh_mode: RefreshCredentialMode::default(),
            credentials_file: None,
        }
    }

    /// Sets the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the refresh credential mode
    pub fn with_refresh_mode(mut self, mode: RefreshCredentialMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    /// Persists credentials to the given file
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    /// The overall timeout for a single request
    ///
    /// A zero timeout would fail every request, so the default is used instead.
    pub fn timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            tracing::warn!("ignoring a zero request timeout");
            default_timeout()
        } else {
            self.timeout
        }
    }
}
