//! Service configuration.
//!
//! Configuration is layered with the `config` crate: built-in defaults, an
//! optional YAML/TOML/JSON file, then the process environment. The environment
//! variable names follow the dashboard deployment (`LITELLM_PROXY_URL`,
//! `LITELLM_API_KEY`, `ADMIN_EMAIL`, ...).

use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest admin session a token may grant, one year.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Environment variables and the configuration keys they override.
///
/// Later entries win, so `SESSION_SECRET` takes precedence over the legacy
/// `NEXTAUTH_SECRET`.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LITELLM_PROXY_URL", "proxy.base_url"),
    ("LITELLM_API_KEY", "proxy.api_key"),
    ("LITELLM_TIMEOUT_MS", "proxy.timeout_ms"),
    ("LITELLM_DETAIL_CONCURRENCY", "proxy.detail_concurrency"),
    ("LITELLM_ASSIGNMENT_ENDPOINT", "proxy.assignment_endpoint"),
    ("ADMIN_EMAIL", "admin.email"),
    ("ADMIN_PASSWORD", "admin.password"),
    ("NEXTAUTH_SECRET", "admin.session_secret"),
    ("SESSION_SECRET", "admin.session_secret"),
    ("SESSION_TTL_SECS", "admin.session_ttl_secs"),
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("TIMESTAMP_STORE_PATH", "dashboard.timestamp_store_path"),
    ("LOG_LEVEL", "telemetry.log_level"),
    ("JSON_LOGS", "telemetry.json_logs"),
];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LiteLLM proxy connection
    pub proxy: ProxyConfig,
    /// Admin identity and sessions
    pub admin: AdminConfig,
    /// HTTP listener
    pub server: ServerConfig,
    /// Dashboard view state
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

/// Which proxy endpoint performs budget assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentEndpoint {
    /// `POST /customer/update` (current proxy releases)
    #[default]
    CustomerUpdate,
    /// `POST /budget/assign` (legacy proxy releases)
    BudgetAssign,
}

impl AssignmentEndpoint {
    /// Request path on the proxy.
    pub fn path(&self) -> &'static str {
        match self {
            AssignmentEndpoint::CustomerUpdate => "/customer/update",
            AssignmentEndpoint::BudgetAssign => "/budget/assign",
        }
    }
}

/// LiteLLM proxy connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Base URL of the proxy, e.g. `http://localhost:4000`
    pub base_url: String,
    /// Static bearer token sent with every call
    pub api_key: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Upper bound on concurrent per-customer detail fetches; unbounded when unset
    #[serde(default)]
    pub detail_concurrency: Option<usize>,
    /// Endpoint used to assign budgets
    #[serde(default)]
    pub assignment_endpoint: AssignmentEndpoint,
}

impl ProxyConfig {
    /// Request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            api_key: String::new(),
            timeout_ms: 30_000,
            detail_concurrency: None,
            assignment_endpoint: AssignmentEndpoint::default(),
        }
    }
}

/// The single admin identity allowed to use the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Admin login email
    pub email: String,
    /// Admin login password
    #[serde(skip_serializing)]
    pub password: String,
    /// Secret used to sign session tokens
    #[serde(skip_serializing)]
    pub session_secret: String,
    /// Session lifetime in seconds
    pub session_ttl_secs: u64,
}

impl AdminConfig {
    /// Session lifetime as a Duration.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            session_secret: String::new(),
            session_ttl_secs: 30 * 24 * 60 * 60,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Allowed CORS origins; any origin when empty
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
        }
    }
}

/// Dashboard view-state settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// JSON file holding synthetic customer creation timestamps; kept in memory when unset
    #[serde(default)]
    pub timestamp_store_path: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default log level or `EnvFilter` directive
    pub log_level: String,
    /// Emit JSON log lines
    pub json_logs: bool,
    /// Service name attached to startup logs
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "liteclient".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from defaults and the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load configuration from defaults, an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Load configuration, resolving environment variables through `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let mut builder = config::Config::builder()
            .set_default("proxy.base_url", defaults.proxy.base_url)?
            .set_default("proxy.api_key", defaults.proxy.api_key)?
            .set_default("proxy.timeout_ms", defaults.proxy.timeout_ms as i64)?
            .set_default("proxy.assignment_endpoint", "customer_update")?
            .set_default("admin.email", defaults.admin.email)?
            .set_default("admin.password", defaults.admin.password)?
            .set_default("admin.session_secret", defaults.admin.session_secret)?
            .set_default("admin.session_ttl_secs", defaults.admin.session_ttl_secs as i64)?
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("telemetry.log_level", defaults.telemetry.log_level)?
            .set_default("telemetry.json_logs", defaults.telemetry.json_logs)?
            .set_default("telemetry.service_name", defaults.telemetry.service_name)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                builder = builder.set_override(*key, value)?;
            }
        }

        let config = builder.build()?.try_deserialize::<Config>()?;
        Ok(config)
    }

    /// Validate the configuration before the service starts.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.proxy.base_url.trim();
        if base_url.is_empty() {
            return Err(Error::config_key("proxy base URL is required", "proxy.base_url"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::config_key(
                format!("proxy base URL must be http(s): {}", base_url),
                "proxy.base_url",
            ));
        }
        if self.proxy.api_key.is_empty() {
            return Err(Error::config_key("proxy API key is required", "proxy.api_key"));
        }
        if self.proxy.timeout_ms == 0 {
            return Err(Error::config_key("timeout must be positive", "proxy.timeout_ms"));
        }
        if self.proxy.detail_concurrency == Some(0) {
            return Err(Error::config_key(
                "detail concurrency must be at least 1 when set",
                "proxy.detail_concurrency",
            ));
        }
        if self.admin.email.trim().is_empty() {
            return Err(Error::config_key("admin email is required", "admin.email"));
        }
        if self.admin.password.is_empty() {
            return Err(Error::config_key("admin password is required", "admin.password"));
        }
        if self.admin.session_secret.is_empty() {
            return Err(Error::config_key(
                "session secret is required",
                "admin.session_secret",
            ));
        }
        if self.admin.session_ttl_secs == 0 {
            return Err(Error::config_key(
                "session TTL must be positive",
                "admin.session_ttl_secs",
            ));
        }
        if self.admin.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(Error::config_key(
                format!("session TTL must not exceed {} seconds", MAX_SESSION_TTL_SECS),
                "admin.session_ttl_secs",
            ));
        }
        for origin in &self.server.cors_origins {
            let http = origin.starts_with("http://") || origin.starts_with("https://");
            if !http || origin.parse::<axum::http::HeaderValue>().is_err() {
                return Err(Error::config_key(
                    format!("invalid CORS origin: {:?}", origin),
                    "server.cors_origins",
                ));
            }
        }
        Ok(())
    }
}
