use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub vapid: VapidConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub ratelimit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Backend type: "postgres" or "memory" (default: "postgres")
    #[serde(default = "default_database_backend")]
    pub backend: String,
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// VAPID key material identifying this server to push services.
///
/// The private key is the URL-safe base64 encoding of the ES256 secret,
/// the same format `web-push generate-vapid-keys` emits.
#[derive(Debug, Clone, Deserialize)]
pub struct VapidConfig {
    pub private_key: String,
    /// Contact claim sent to push services, e.g. "mailto:ops@example.com"
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Maximum number of in-flight deliveries during a fan-out
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Whether trigger-endpoint rate limiting is enabled
    #[serde(default = "default_ratelimit_enabled")]
    pub enabled: bool,
    /// Maximum trigger calls per window (per caller identity)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Time after which idle windows are removed (seconds)
    #[serde(default = "default_stale_after")]
    pub stale_after_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_database_backend() -> String {
    "postgres".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/meridian".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    600
}

fn default_max_concurrent_sends() -> usize {
    100
}

fn default_ratelimit_enabled() -> bool {
    true
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_seconds() -> u64 {
    60
}

fn default_stale_after() -> u64 {
    300
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8082)?
            .set_default("database.backend", "postgres")?
            .set_default("database.url", "postgres://localhost:5432/meridian")?
            .set_default("push.max_concurrent_sends", 100)?
            .set_default("ratelimit.enabled", true)?
            .set_default("ratelimit.max_requests", 10)?
            .set_default("ratelimit.window_seconds", 60)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_HOST, SERVER_PORT, JWT_SECRET, DATABASE_URL, VAPID_PRIVATE_KEY, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sends: default_max_concurrent_sends(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_ratelimit_enabled(),
            max_requests: default_max_requests(),
            window_seconds: default_window_seconds(),
            stale_after_seconds: default_stale_after(),
        }
    }
}
