//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use tally_http::DEFAULT_TIMEOUT;

use crate::error::CoreError;
use crate::Result;

pub const API_URL_VAR: &str = "TALLY_API_URL";
pub const TIMEOUT_VAR: &str = "TALLY_REQUEST_TIMEOUT_SECS";
pub const DATA_DIR_VAR: &str = "TALLY_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend base URL; empty means same origin
    pub api_url: String,
    /// Ceiling for any single request
    pub request_timeout: Duration,
    /// SQLite file holding the persisted tokens
    pub database_path: PathBuf,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            api_url: String::new(),
            request_timeout: DEFAULT_TIMEOUT,
            database_path: data_dir.join("tally.db"),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve configuration once from the environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup(DATA_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(Self::data_dir);

        let mut config = Self::new(data_dir);

        if let Some(api_url) = lookup(API_URL_VAR) {
            config.api_url = api_url.trim().to_string();
        }

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| CoreError::Config(format!("{TIMEOUT_VAR} must be whole seconds, got {raw:?}")))?;
            if secs == 0 {
                return Err(CoreError::Config(format!("{TIMEOUT_VAR} must be positive")));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Tally"))
            .unwrap_or_else(|| PathBuf::from(".tally"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
