use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Deployment environment; only `Development` exposes internal error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

impl AppEnv {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            _ => Err(ConfigError::Invalid(
                "APP_ENV must be one of development, production, test".to_string(),
            )),
        }
    }

    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub app_env: AppEnv,
    pub database_path: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwks_url: String,
    pub supabase_jwt_issuer: String,
    pub supabase_jwt_audience: String,
    pub supabase_jwt_secret: Option<String>,
    pub jwks_cache_ttl: Duration,
    pub auth_clock_skew: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u32,
    pub ai_provider_api_key: Option<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("app_env", &self.app_env)
            .field("database_path", &self.database_path)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &self.supabase_anon_key)
            .field("supabase_jwks_url", &self.supabase_jwks_url)
            .field("supabase_jwt_issuer", &self.supabase_jwt_issuer)
            .field("supabase_jwt_audience", &self.supabase_jwt_audience)
            .field(
                "supabase_jwt_secret",
                &self.supabase_jwt_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field(
                "ai_provider_api_key",
                &self.ai_provider_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = value_or_default(&lookup, "PORT", "8080")
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid("PORT must be an integer in [1, 65535]".to_string()))?;
        let bind_addr = value_or_default(
            &lookup,
            "JOURNAL_API_BIND_ADDR",
            &format!("127.0.0.1:{port}"),
        );

        let app_env = AppEnv::parse(&value_or_default(&lookup, "APP_ENV", "development"))?;
        let database_path = value_or_default(&lookup, "DATABASE_PATH", "journal.db");

        let supabase_url = required_trimmed(&lookup, "SUPABASE_URL")?;
        let supabase_anon_key = required_trimmed(&lookup, "SUPABASE_ANON_KEY")?;
        if !is_http_url(&supabase_url) {
            return Err(ConfigError::Invalid(
                "SUPABASE_URL must start with http:// or https://".to_string(),
            ));
        }
        let supabase_url = trim_trailing(&supabase_url).to_string();

        let default_jwks = format!("{supabase_url}/auth/v1/.well-known/jwks.json");
        let supabase_jwks_url = value_or_default(&lookup, "SUPABASE_JWKS_URL", &default_jwks);
        if !is_http_url(&supabase_jwks_url) {
            return Err(ConfigError::Invalid(
                "SUPABASE_JWKS_URL must start with http:// or https://".to_string(),
            ));
        }

        let default_issuer = format!("{supabase_url}/auth/v1");
        let supabase_jwt_issuer = value_or_default(&lookup, "SUPABASE_JWT_ISSUER", &default_issuer);
        let supabase_jwt_audience =
            value_or_default(&lookup, "SUPABASE_JWT_AUDIENCE", "authenticated");
        let supabase_jwt_secret = optional_trimmed(&lookup, "SUPABASE_JWT_SECRET");

        let jwks_cache_ttl_secs = value_or_default(&lookup, "SUPABASE_JWKS_CACHE_TTL_SECS", "300")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "SUPABASE_JWKS_CACHE_TTL_SECS must be an integer >= 30".to_string(),
                )
            })?;
        if jwks_cache_ttl_secs < 30 {
            return Err(ConfigError::Invalid(
                "SUPABASE_JWKS_CACHE_TTL_SECS must be >= 30".to_string(),
            ));
        }

        let auth_clock_skew_secs = value_or_default(&lookup, "AUTH_CLOCK_SKEW_SECS", "60")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "AUTH_CLOCK_SKEW_SECS must be an integer in [0, 300]".to_string(),
                )
            })?;
        if auth_clock_skew_secs > 300 {
            return Err(ConfigError::Invalid(
                "AUTH_CLOCK_SKEW_SECS must be in [0, 300]".to_string(),
            ));
        }

        let rate_limit_window_secs = value_or_default(&lookup, "RATE_LIMIT_WINDOW_SECS", "60")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "RATE_LIMIT_WINDOW_SECS must be an integer in [1, 3600]".to_string(),
                )
            })?;
        if !(1..=3_600).contains(&rate_limit_window_secs) {
            return Err(ConfigError::Invalid(
                "RATE_LIMIT_WINDOW_SECS must be in [1, 3600]".to_string(),
            ));
        }

        let rate_limit_max_requests = value_or_default(&lookup, "RATE_LIMIT_MAX_REQUESTS", "100")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "RATE_LIMIT_MAX_REQUESTS must be an integer in [1, 10000]".to_string(),
                )
            })?;
        if !(1..=10_000).contains(&rate_limit_max_requests) {
            return Err(ConfigError::Invalid(
                "RATE_LIMIT_MAX_REQUESTS must be in [1, 10000]".to_string(),
            ));
        }

        let ai_provider_api_key = optional_trimmed(&lookup, "AI_PROVIDER_API_KEY");

        Ok(Self {
            bind_addr,
            app_env,
            database_path,
            supabase_url,
            supabase_anon_key,
            supabase_jwks_url,
            supabase_jwt_issuer,
            supabase_jwt_audience,
            supabase_jwt_secret,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            rate_limit_max_requests,
            ai_provider_api_key,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches('/')
}
