//! Portal configuration loaded from `LENDPORTAL_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::api::PUBLIC_ENDPOINTS;
use crate::error::{AppError, AppResult};
use crate::navigation::{LANDING_PATH, LOGIN_PATH};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Base URL every endpoint path is appended to (includes the `/api` prefix).
    pub api_base_url: String,
    /// Where the session is persisted; `None` keeps it in memory only.
    pub session_file: Option<PathBuf>,
    pub timeout: Duration,
    /// Drop stored credentials whose `exp` has passed instead of waiting for a 401.
    pub enforce_expiry: bool,
    pub json_output: bool,
    pub login_path: String,
    pub landing_path: String,
    /// Endpoint paths that never carry a credential.
    pub public_endpoints: Vec<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            session_file: default_session_file(),
            timeout: Duration::from_secs(30),
            enforce_expiry: false,
            json_output: false,
            login_path: LOGIN_PATH.to_string(),
            landing_path: LANDING_PATH.to_string(),
            public_endpoints: PUBLIC_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn default_session_file() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".lendportal").join("session.json"))
}

fn parse_bool(key: &str, v: &str) -> AppResult<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::config("invalid_bool".to_string(), format!("{key}: expected true/false, got '{other}'"))),
    }
}

impl PortalConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable source; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(url) = lookup("LENDPORTAL_API_URL") {
            cfg.api_base_url = url;
        }
        if let Some(path) = lookup("LENDPORTAL_SESSION_FILE") {
            let path = path.trim();
            cfg.session_file = if path.is_empty() || path.eq_ignore_ascii_case("memory") {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(secs) = lookup("LENDPORTAL_TIMEOUT_SECS") {
            let n: u64 = secs.trim().parse().map_err(|_| {
                AppError::config("invalid_timeout".to_string(), format!("LENDPORTAL_TIMEOUT_SECS: '{secs}' is not a number"))
            })?;
            cfg.timeout = Duration::from_secs(n);
        }
        if let Some(v) = lookup("LENDPORTAL_ENFORCE_EXPIRY") {
            cfg.enforce_expiry = parse_bool("LENDPORTAL_ENFORCE_EXPIRY", &v)?;
        }
        if let Some(v) = lookup("LENDPORTAL_OUTPUT") {
            cfg.json_output = v.trim().eq_ignore_ascii_case("json");
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> AppResult<()> {
        let url = Url::parse(&self.api_base_url).map_err(|e| {
            AppError::config("invalid_api_url".to_string(), format!("'{}': {}", self.api_base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::config(
                "invalid_api_url".to_string(),
                format!("'{}': scheme must be http or https", self.api_base_url),
            ));
        }
        if self.timeout.is_zero() {
            return Err(AppError::config("invalid_timeout".to_string(), "timeout must be at least one second".to_string()));
        }
        Ok(())
    }
}
