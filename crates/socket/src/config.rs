//! Socket configuration.
//!
//! Defaults mirror what the site ships to every page. Durations are plain
//! millisecond counts so settings can be read from JSON or the environment.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Query parameter carrying the per-process session id.
pub const SRI_PARAM: &str = "sri";

/// Query parameter carrying the last known event version.
pub const VERSION_PARAM: &str = "v";

pub const DEFAULT_BASE_URL: &str = "localhost:9664";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid socket URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("No base URLs configured")]
    NoBaseUrls,

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Random session id shared by every socket of this process.
pub fn session_id() -> &'static str {
    static SRI: OnceLock<String> = OnceLock::new();
    SRI.get_or_init(|| {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect()
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketOptions {
    /// Label used in logs
    pub name: String,
    /// Start in idle mode
    pub idle: bool,
    /// Time to wait for a pong before resetting the connection
    pub ping_max_lag_ms: u64,
    /// Time between a pong and the next ping
    pub ping_delay_ms: u64,
    pub auto_reconnect_delay_ms: u64,
    /// `ws` or `wss`
    pub protocol: String,
    /// Equivalent hosts, tried in order on failure
    pub base_urls: Vec<String>,
    pub is_auth: bool,
    pub debug: bool,
    /// Inactivity before the socket is considered idle
    pub idle_timeout_ms: u64,
    /// Idle time after which the socket is destroyed
    pub idle_disconnect_after_ms: u64,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            idle: false,
            ping_max_lag_ms: 9_000,
            ping_delay_ms: 2_500,
            auto_reconnect_delay_ms: 3_500,
            protocol: "wss".to_string(),
            base_urls: vec![DEFAULT_BASE_URL.to_string()],
            is_auth: false,
            debug: false,
            idle_timeout_ms: 10 * 60 * 1000,
            idle_disconnect_after_ms: 2 * 60 * 60 * 1000,
        }
    }
}

impl SocketOptions {
    pub fn ping_max_lag(&self) -> Duration {
        Duration::from_millis(self.ping_max_lag_ms)
    }

    pub fn ping_delay(&self) -> Duration {
        Duration::from_millis(self.ping_delay_ms)
    }

    pub fn auto_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.auto_reconnect_delay_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn idle_disconnect_after(&self) -> Duration {
        Duration::from_millis(self.idle_disconnect_after_ms)
    }
}

/// Everything needed to build one socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketSettings {
    /// Endpoint path, e.g. `/socket` or `/play/abcd1234/v5`
    pub path: String,
    /// Last known event version; `None` for an unversioned socket
    #[serde(default)]
    pub version: Option<u64>,
    /// Query parameters appended to every connection URL
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub options: SocketOptions,
}

impl SocketSettings {
    /// Settings for `path` with default options and the process session id.
    pub fn new(path: impl Into<String>, version: Option<u64>) -> Self {
        let mut params = BTreeMap::new();
        params.insert(SRI_PARAM.to_string(), session_id().to_string());
        Self {
            path: path.into(),
            version,
            params,
            options: SocketOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SocketOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn sri(&self) -> &str {
        self.params.get(SRI_PARAM).map(String::as_str).unwrap_or("")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.options.base_urls.iter().all(|u| u.trim().is_empty()) {
            return Err(ConfigError::NoBaseUrls);
        }
        Ok(())
    }

    /// Full connection URL: `<protocol>://<base><path>?<params>[&v=<version>]`.
    pub fn socket_url(&self, base_url: &str, version: Option<u64>) -> Result<Url, ConfigError> {
        let protocol = self.options.protocol.trim_end_matches(':');
        let mut url = Url::parse(&format!("{}://{}{}", protocol, base_url, self.path))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
            if let Some(version) = version {
                query.append_pair(VERSION_PARAM, &version.to_string());
            }
        }
        Ok(url)
    }

    /// Load settings from `DRAUGHTS_SOCKET_*` environment variables.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("DRAUGHTS_SOCKET_PATH").unwrap_or_else(|_| "/socket".into());
        let version = match std::env::var("DRAUGHTS_SOCKET_VERSION") {
            Ok(raw) => Some(raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                var: "DRAUGHTS_SOCKET_VERSION",
                value: raw.clone(),
            })?),
            Err(_) => None,
        };

        let mut options = SocketOptions::default();
        if let Ok(name) = std::env::var("DRAUGHTS_SOCKET_NAME") {
            options.name = name;
        }
        if let Ok(protocol) = std::env::var("DRAUGHTS_SOCKET_PROTOCOL") {
            options.protocol = protocol;
        }
        if let Ok(raw) = std::env::var("DRAUGHTS_SOCKET_BASE_URLS") {
            options.base_urls = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        options.is_auth = env_flag("DRAUGHTS_SOCKET_AUTH")?.unwrap_or(options.is_auth);
        options.debug = env_flag("DRAUGHTS_SOCKET_DEBUG")?.unwrap_or(options.debug);

        let settings = Self::new(path, version).with_options(options);
        settings.validate()?;
        Ok(settings)
    }
}

fn env_flag(var: &'static str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnv { var, value: raw }),
        },
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_with_version() {
        let settings = SocketSettings::new("/play/abcd1234/v5", Some(5)).with_param("sri", "xyz");
        let url = settings.socket_url("socket.example.org", Some(5)).expect("url");
        assert_eq!(
            url.as_str(),
            "wss://socket.example.org/play/abcd1234/v5?sri=xyz&v=5"
        );
    }

    #[test]
    fn test_socket_url_unversioned_keeps_params() {
        let mut settings = SocketSettings::new("/socket", None)
            .with_param("sri", "xyz")
            .with_param("flag", "a b");
        settings.options.protocol = "ws:".into();
        let url = settings.socket_url("localhost:9664", None).expect("url");
        assert_eq!(url.as_str(), "ws://localhost:9664/socket?flag=a+b&sri=xyz");
    }

    #[test]
    fn test_session_id_is_stable() {
        assert_eq!(session_id(), session_id());
        assert_eq!(session_id().len(), 12);
        assert_eq!(SocketSettings::new("/socket", None).sri(), session_id());
    }

    #[test]
    fn test_validate_requires_base_url() {
        let mut settings = SocketSettings::new("/socket", None);
        settings.options.base_urls = vec![" ".into()];
        assert!(matches!(settings.validate(), Err(ConfigError::NoBaseUrls)));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: SocketOptions =
            serde_json::from_str(r#"{"name":"round","is_auth":true}"#).expect("parse");
        assert_eq!(options.name, "round");
        assert!(options.is_auth);
        assert_eq!(options.ping_max_lag(), Duration::from_millis(9_000));
        assert_eq!(options.auto_reconnect_delay(), Duration::from_millis(3_500));
    }
}
