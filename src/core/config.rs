use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub swagger: SwaggerConfig,
    pub realtime: RealtimeConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Token verification settings.
///
/// Either a shared HS256 secret (`AUTH_JWT_SECRET`) or an OIDC issuer whose
/// JWKS endpoint serves RS256 keys (`AUTH_ISSUER` + `AUTH_AUDIENCE`). When both
/// are present the shared secret wins.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub jwks_cache_ttl: Duration,
    pub jwt_leeway: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Settings for the server-sent-events channel
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Frames buffered per subscriber before it is considered lagging and dropped
    pub channel_capacity: usize,
    /// Interval between keep-alive comments on idle streams
    pub keep_alive: Duration,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Upper bound for a single repository call
    pub timeout: Duration,
}

/// Configuration for the API client and the realtime subscriber
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub reconnect_initial_delay: Duration,
    pub reconnect_max_delay: Duration,
    /// `None` retries forever, `Some(0)` never reconnects
    pub reconnect_max_attempts: Option<u32>,
}

fn env_or<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Load the server configuration. Expects `.env` to have been loaded already.
    pub fn from_env() -> Result<Self, String> {
        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env(),
            realtime: RealtimeConfig::from_env()?,
            store: StoreConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size =
            env_or("MAX_REQUEST_BODY_SIZE", Self::DEFAULT_MAX_REQUEST_BODY_SIZE)?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: env_or("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: env_or("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: env_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl AuthConfig {
    const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 3600; // 1 hour
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = non_empty_var("AUTH_JWT_SECRET");
        let issuer = non_empty_var("AUTH_ISSUER");
        let audience = non_empty_var("AUTH_AUDIENCE");

        if jwt_secret.is_none() {
            match (&issuer, &audience) {
                (Some(_), Some(_)) => {}
                (Some(_), None) => {
                    return Err("AUTH_AUDIENCE is required when AUTH_ISSUER is set".to_string())
                }
                _ => {
                    return Err(
                        "Either AUTH_JWT_SECRET or AUTH_ISSUER/AUTH_AUDIENCE must be set"
                            .to_string(),
                    )
                }
            }
        }

        let jwks_cache_ttl_secs = env_or("JWKS_CACHE_TTL", Self::DEFAULT_JWKS_CACHE_TTL_SECS)?;
        let jwt_leeway_secs = env_or("JWT_LEEWAY", Self::DEFAULT_JWT_LEEWAY_SECS)?;

        Ok(Self {
            jwt_secret,
            issuer,
            audience,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
        })
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("jwt_leeway", &self.jwt_leeway)
            .finish()
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Self {
        // Only use credentials if they are non-empty
        let username = non_empty_var("SWAGGER_USERNAME");
        let password = non_empty_var("SWAGGER_PASSWORD");
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Pinboard API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Map locations and realtime updates".to_string());

        Self {
            username,
            password,
            title,
            version,
            description,
        }
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl RealtimeConfig {
    const DEFAULT_CHANNEL_CAPACITY: usize = 64;
    const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;

    pub fn from_env() -> Result<Self, String> {
        let channel_capacity = env_or("REALTIME_CHANNEL_CAPACITY", Self::DEFAULT_CHANNEL_CAPACITY)?;
        if channel_capacity == 0 {
            return Err("REALTIME_CHANNEL_CAPACITY must be greater than zero".to_string());
        }
        let keep_alive_secs = env_or("REALTIME_KEEP_ALIVE_SECS", Self::DEFAULT_KEEP_ALIVE_SECS)?;

        Ok(Self {
            channel_capacity,
            keep_alive: Duration::from_secs(keep_alive_secs.max(1)),
        })
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
            keep_alive: Duration::from_secs(Self::DEFAULT_KEEP_ALIVE_SECS),
        }
    }
}

impl StoreConfig {
    const DEFAULT_TIMEOUT_SECS: u64 = 15;

    pub fn from_env() -> Result<Self, String> {
        let timeout_secs = env_or("STORE_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS)?;
        Ok(Self {
            timeout: Duration::from_secs(timeout_secs.max(1)),
        })
    }
}

impl ClientConfig {
    const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:3000/api";
    const DEFAULT_TIMEOUT_SECS: u64 = 15;
    const DEFAULT_RECONNECT_INITIAL_MS: u64 = 500;
    const DEFAULT_RECONNECT_MAX_MS: u64 = 30_000;
    const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 10;

    pub fn from_env() -> Result<Self, String> {
        let base_url =
            non_empty_var("API_BASE_URL").unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());
        let timeout_secs = env_or("API_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS)?;
        let initial_ms = env_or("RECONNECT_INITIAL_MS", Self::DEFAULT_RECONNECT_INITIAL_MS)?;
        let max_ms = env_or("RECONNECT_MAX_MS", Self::DEFAULT_RECONNECT_MAX_MS)?;

        // "unlimited" keeps retrying forever
        let reconnect_max_attempts = match non_empty_var("RECONNECT_MAX_ATTEMPTS") {
            Some(raw) if raw.eq_ignore_ascii_case("unlimited") => None,
            Some(raw) => Some(
                raw.trim()
                    .parse::<u32>()
                    .map_err(|_| "RECONNECT_MAX_ATTEMPTS must be a number or 'unlimited'")?,
            ),
            None => Some(Self::DEFAULT_RECONNECT_MAX_ATTEMPTS),
        };

        Ok(Self {
            base_url,
            token: non_empty_var("API_TOKEN"),
            timeout: Duration::from_secs(timeout_secs.max(1)),
            reconnect_initial_delay: Duration::from_millis(initial_ms),
            reconnect_max_delay: Duration::from_millis(max_ms.max(initial_ms)),
            reconnect_max_attempts,
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            reconnect_initial_delay: Duration::from_millis(Self::DEFAULT_RECONNECT_INITIAL_MS),
            reconnect_max_delay: Duration::from_millis(Self::DEFAULT_RECONNECT_MAX_MS),
            reconnect_max_attempts: Some(Self::DEFAULT_RECONNECT_MAX_ATTEMPTS),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("reconnect_initial_delay", &self.reconnect_initial_delay)
            .field("reconnect_max_delay", &self.reconnect_max_delay)
            .field("reconnect_max_attempts", &self.reconnect_max_attempts)
            .finish()
    }
}
