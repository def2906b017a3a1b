use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable that supplies the token signing secret.
/// Takes precedence over `auth.jwt_secret`.
pub const JWT_SECRET_ENV: &str = "PEERLY_JWT_SECRET";

/// Lowest PBKDF2 iteration count accepted for new credentials.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/peerly.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign bearer tokens.
    /// Prefer setting `PEERLY_JWT_SECRET` instead of writing it here.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub jwt_secret: String,

    /// One of HS256, HS384, HS512
    pub jwt_algorithm: String,

    pub token_ttl_minutes: u32,

    /// PBKDF2-HMAC-SHA256 iterations for new credentials.
    /// Existing credentials keep the count they were created with.
    pub pbkdf2_iterations: u32,

    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_algorithm: "HS256".to_string(),
            token_ttl_minutes: 30,
            pbkdf2_iterations: MIN_PBKDF2_ITERATIONS,
            min_password_length: 6,
        }
    }
}

// Hand-written so the secret never ends up in logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("pbkdf2_iterations", &self.pbkdf2_iterations)
            .field("min_password_length", &self.min_password_length)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Delay before retrying a failed purge (default: 3600 = 1 hour)
    pub retry_backoff_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retry_backoff_seconds: 60 * 60,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub const fn retry_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.retry_backoff_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Config {
    /// Loads the first config file found, then applies environment overrides.
    pub fn load() -> Result<Self> {
        // A missing .env is normal outside development.
        let _ = dotenvy::dotenv();

        let mut config = Self::load_file()?;
        config.apply_env();
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV)
            && !secret.trim().is_empty()
        {
            self.auth.jwt_secret = secret;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("peerly").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".peerly").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Startup checks. Any failure here must stop the process before it serves.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            anyhow::bail!(
                "Token signing secret is not configured. Set {JWT_SECRET_ENV} or auth.jwt_secret"
            );
        }

        if !matches!(
            self.auth.jwt_algorithm.as_str(),
            "HS256" | "HS384" | "HS512"
        ) {
            anyhow::bail!(
                "Unsupported token algorithm '{}': expected HS256, HS384 or HS512",
                self.auth.jwt_algorithm
            );
        }

        if self.auth.token_ttl_minutes == 0 {
            anyhow::bail!("auth.token_ttl_minutes must be > 0");
        }

        if self.auth.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
            anyhow::bail!(
                "auth.pbkdf2_iterations must be at least {MIN_PBKDF2_ITERATIONS}, got {}",
                self.auth.pbkdf2_iterations
            );
        }

        if self.scheduler.enabled && self.scheduler.retry_backoff_seconds == 0 {
            anyhow::bail!("scheduler.retry_backoff_seconds must be > 0");
        }

        Ok(())
    }
}
