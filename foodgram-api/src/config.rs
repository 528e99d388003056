/// Server configuration read from the environment
///
/// A `.env` file in the working directory is loaded first when present.
///
/// | Variable | Default |
/// |---|---|
/// | `DATABASE_URL` | required |
/// | `DATABASE_MAX_CONNECTIONS` | 10 |
/// | `API_HOST` / `API_PORT` | 0.0.0.0 / 8080 |
/// | `CORS_ORIGINS` | `*` (comma-separated list otherwise) |
/// | `PRODUCTION` | false (true turns on HSTS) |
/// | `PUBLIC_URL` | http://localhost:8080 |
/// | `JWT_SECRET` | required, 32+ characters |
/// | `MEDIA_ROOT` | ./media |
/// | `PAGE_SIZE` | 6 |
///
/// ```no_run
/// use foodgram_api::config::Config;
///
/// let config = Config::from_env().expect("invalid configuration");
/// println!("Binding {}", config.bind_address());
/// ```

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
}

/// HTTP listener and response settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,

    /// Production mode (turns on HSTS)
    pub production: bool,

    /// Externally visible base URL, without a trailing slash
    pub public_url: String,

    /// Default page size for paginated lists
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared secret used to verify bearer tokens
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory images are written below
    pub root: String,
}

/// Splits a comma-separated list, dropping blanks
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("Invalid boolean value: {}", other),
    }
}

/// `name` or `default` when unset
fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required_var(name: &str) -> anyhow::Result<String> {
    env::var(name).map_err(|_| anyhow::anyhow!("{} environment variable is required", name))
}

/// Parses `name`, naming the variable in the error
fn parsed_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", name, raw, e))
}

impl Config {
    /// Reads every setting, failing on the first missing or malformed one
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let page_size: i64 = parsed_var("PAGE_SIZE", "6")?;
        if page_size < 1 {
            anyhow::bail!("PAGE_SIZE must be positive");
        }

        let secret = required_var("JWT_SECRET")?;
        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        Ok(Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port: parsed_var("API_PORT", "8080")?,
                cors_origins: parse_list(&var_or("CORS_ORIGINS", "*")),
                production: parse_bool(&var_or("PRODUCTION", ""))?,
                public_url: var_or("PUBLIC_URL", "http://localhost:8080")
                    .trim_end_matches('/')
                    .to_string(),
                page_size,
            },
            database: DatabaseConfig {
                url: required_var("DATABASE_URL")?,
                max_connections: parsed_var("DATABASE_MAX_CONNECTIONS", "10")?,
            },
            jwt: JwtConfig { secret },
            media: MediaConfig {
                root: var_or("MEDIA_ROOT", "./media"),
            },
        })
    }

    /// `host:port` for the TCP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Public URL of a stored image
    pub fn media_url(&self, key: &str) -> String {
        format!("{}/media/{}", self.api.public_url, key)
    }
}
