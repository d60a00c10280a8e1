use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// How long an issued session stays valid, in days
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
    /// Name of the HTTP-only cookie carrying the session token
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Mark the session cookie `Secure` (enable when served over HTTPS)
    #[serde(default)]
    pub cookie_secure: bool,
    /// Interval between expired-session sweeps, in seconds
    #[serde(default = "default_session_sweep_interval")]
    pub session_sweep_interval_secs: u64,
    /// Admin account created on first start when both fields are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
}

impl AuthConfig {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_days(self.session_ttl_days)
            .unwrap_or_else(|| chrono::Duration::days(MAX_SESSION_TTL_DAYS))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: default_session_ttl_days(),
            cookie_name: default_cookie_name(),
            cookie_secure: false,
            session_sweep_interval_secs: default_session_sweep_interval(),
            admin_email: None,
            admin_password: None,
            admin_name: default_admin_name(),
        }
    }
}

/// Upper bound on the session window
const MAX_SESSION_TTL_DAYS: i64 = 365;

fn default_session_ttl_days() -> i64 {
    7
}

fn default_cookie_name() -> String {
    "auth_token".to_string()
}

fn default_session_sweep_interval() -> u64 {
    24 * 60 * 60
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_requests")]
    pub api_requests_per_window: u32,
    #[serde(default = "default_auth_requests")]
    pub auth_requests_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Seconds between purges of idle limiter entries
    #[serde(default = "default_rate_limit_cleanup")]
    pub cleanup_interval: u64,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP`. Only enable behind a
    /// reverse proxy that overwrites these headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_requests_per_window: default_api_requests(),
            auth_requests_per_window: default_auth_requests(),
            window_seconds: default_window_seconds(),
            cleanup_interval: default_rate_limit_cleanup(),
            trust_proxy_headers: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_requests() -> u32 {
    300
}

fn default_auth_requests() -> u32 {
    20
}

fn default_window_seconds() -> u64 {
    60
}

fn default_rate_limit_cleanup() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Rooms inserted at startup when missing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub rooms: Vec<SeedRoom>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRoom {
    pub room_number: String,
    #[serde(default = "default_room_type")]
    pub room_type: String,
    pub capacity: Option<i64>,
    pub location: Option<String>,
    pub floor_number: Option<i64>,
    #[serde(default)]
    pub assets: Vec<String>,
}

fn default_room_type() -> String {
    "classroom".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let ttl = self.auth.session_ttl_days;
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&ttl) {
            anyhow::bail!(
                "auth.session_ttl_days must be between 1 and {} (got {})",
                MAX_SESSION_TTL_DAYS,
                ttl
            );
        }
        if self.rate_limit.window_seconds == 0 {
            anyhow::bail!("rate_limit.window_seconds must be at least 1");
        }
        Ok(())
    }
}
