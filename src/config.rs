//! Front-end configuration: backend base URL, HTTP port, request timeout and the
//! fixed redirect targets used by the route guard.
//!
//! Values come from CLI flags, then environment variables, then defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub const ENV_API_BASE: &str = "XCONTACT_API_BASE";
pub const ENV_HTTP_PORT: &str = "XCONTACT_HTTP_PORT";
pub const ENV_TIMEOUT_MS: &str = "XCONTACT_TIMEOUT_MS";
pub const ENV_HOME: &str = "XCONTACT_HOME";

#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub http_port: u16,
    /// Backend base URL without trailing slash.
    pub api_base: String,
    pub request_timeout: Duration,
    pub login_route: String,
    pub landing_route: String,
    /// Directory backing the dashboard client's display-profile cache.
    pub profile_dir: PathBuf,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            login_route: crate::identity::LOGIN_ROUTE.to_string(),
            landing_route: crate::identity::LANDING_ROUTE.to_string(),
            profile_dir: default_profile_dir(),
        }
    }
}

impl FrontendConfig {
    /// Defaults overlaid with the `XCONTACT_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(port) = parse_port_env(ENV_HTTP_PORT) { cfg.http_port = port; }
        if let Ok(base) = env::var(ENV_API_BASE) {
            cfg.api_base = normalize_base(&base);
        } else {
            info!(target: "startup", "{} not set, using default: {}", ENV_API_BASE, DEFAULT_API_BASE);
        }
        if let Some(ms) = parse_u64_env(ENV_TIMEOUT_MS) { cfg.request_timeout = Duration::from_millis(ms); }
        if let Ok(home) = env::var(ENV_HOME) {
            if !home.trim().is_empty() { cfg.profile_dir = PathBuf::from(home); }
        }
        cfg
    }

    /// CLI arguments override environment.
    pub fn with_args(mut self, args: &[String]) -> Self {
        if let Some(port) = arg_value(args, "--http-port").and_then(|v| v.parse::<u16>().ok()) {
            self.http_port = port;
        }
        if let Some(base) = arg_value(args, "--api-base") {
            self.api_base = normalize_base(&base);
        }
        if let Some(ms) = arg_value(args, "--timeout-ms").and_then(|v| v.parse::<u64>().ok()) {
            self.request_timeout = Duration::from_millis(ms);
        }
        self
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = normalize_base(base);
        self
    }
}

/// Trim whitespace and trailing slashes; an empty value falls back to the default.
pub fn normalize_base(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        warn!(target: "startup", "empty backend base URL, using default: {}", DEFAULT_API_BASE);
        return DEFAULT_API_BASE.to_string();
    }
    trimmed.to_string()
}

fn default_profile_dir() -> PathBuf {
    let home = env::var("HOME").or_else(|_| env::var("USERPROFILE")).unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".xcontact")
}

fn parse_port_env(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.parse::<u16>().ok(),
        Err(_) => None,
    }
}

fn parse_u64_env(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.trim().parse::<u64>().ok())
}

/// Value following `flag`, if any.
pub fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
