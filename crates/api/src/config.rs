//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `API_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 8000)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `TASK_QUEUE_CAPACITY` - Buffered background tasks (default: 1024)
//! - `TASK_WORKER_CONCURRENCY` - Background tasks run at once (default: 4)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)
//!
//! ## Email (all or none)
//! - `SENDGRID_API_KEY` - `SendGrid` API key (entropy checked)
//! - `EMAIL_FROM_ADDRESS` - Sender address for notifications
//! - `EMAIL_PRODUCT_CHANGE_TEMPLATE_ID` - Dynamic template for product changes
//! - `SENDGRID_BASE_URL` - API base URL (default: <https://api.sendgrid.com>)
//!
//! Without the email group, product change notifications are skipped.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use zebrands_core::Email;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SENDGRID_BASE_URL: &str = "https://api.sendgrid.com";

/// Substrings (lower-case) that mark a secret as a template value.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
];

const EMAIL_VARS: [&str; 3] = [
    "SENDGRID_API_KEY",
    "EMAIL_FROM_ADDRESS",
    "EMAIL_PRODUCT_CHANGE_TEMPLATE_ID",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Background task worker settings
    pub workers: WorkerConfig,
    /// Transactional email settings, if configured
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Background task worker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Tasks buffered before `enqueue` reports the queue as full
    pub queue_capacity: usize,
    /// Tasks executed concurrently
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            concurrency: 4,
        }
    }
}

/// `SendGrid` configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct EmailConfig {
    pub api_key: SecretString,
    pub from_address: Email,
    pub product_change_template_id: String,
    pub base_url: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("api_key", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field(
                "product_change_template_id",
                &self.product_change_template_id,
            )
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the email group is only partially set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`ApiConfig::from_env`].
    pub fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get_database_url(env, "API_DATABASE_URL")?;
        let host = parse_env(env, "API_HOST", "127.0.0.1")?;
        let port = parse_env(env, "API_PORT", "8000")?;
        let json_logs = env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));

        let defaults = WorkerConfig::default();
        let workers = WorkerConfig {
            queue_capacity: parse_env(
                env,
                "TASK_QUEUE_CAPACITY",
                &defaults.queue_capacity.to_string(),
            )?,
            concurrency: parse_env(
                env,
                "TASK_WORKER_CONCURRENCY",
                &defaults.concurrency.to_string(),
            )?,
        };
        if workers.queue_capacity == 0 || workers.concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "TASK_QUEUE_CAPACITY/TASK_WORKER_CONCURRENCY".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let email = EmailConfig::from_lookup(env)?;

        let sentry_dsn = env("SENTRY_DSN");
        let sentry_environment = env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            json_logs,
            workers,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        if EMAIL_VARS.iter().all(|key| env(key).is_none()) {
            return Ok(None);
        }

        let api_key = get_validated_secret(env, "SENDGRID_API_KEY")?;
        let from_address = Email::parse(&get_required_env(env, "EMAIL_FROM_ADDRESS")?)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("EMAIL_FROM_ADDRESS".to_string(), e.to_string())
            })?;
        let product_change_template_id = get_required_env(env, "EMAIL_PRODUCT_CHANGE_TEMPLATE_ID")?;
        let base_url = env("SENDGRID_BASE_URL")
            .unwrap_or_else(|| DEFAULT_SENDGRID_BASE_URL.to_string());
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SENDGRID_BASE_URL".to_string(), e.to_string())
        })?;

        Ok(Some(Self {
            api_key,
            from_address,
            product_change_template_id,
            base_url,
        }))
    }
}

fn get_required_env(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(
    env: &dyn Fn(&str) -> Option<String>,
    primary_key: &str,
) -> Result<SecretString, ConfigError> {
    env(primary_key)
        .or_else(|| env("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Parse an environment variable, using `default` when it is unset.
fn parse_env<T>(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env(key)
        .unwrap_or_else(|| default.to_string())
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Bits of entropy per character, from the character frequencies of `s`.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .into_values()
        .map(|n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject API keys that look copied from a template or are not random.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| ConfigError::InsecureSecret(var_name.to_string(), reason);

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(insecure(format!("looks like a placeholder ('{pattern}')")));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(insecure(format!(
            "{entropy:.2} bits/char is below {MIN_ENTROPY_BITS_PER_CHAR:.1}; \
             use the key issued by the provider"
        )));
    }
    Ok(())
}

fn get_validated_secret(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<SecretString, ConfigError> {
    let value = get_required_env(env, key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    const API_KEY: &str = "SG.q8Zr3LmT5vXw1Ny7Pk2Hj4Bd";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config =
            ApiConfig::from_lookup(&lookup(&[("API_DATABASE_URL", "postgres://localhost/zb")]))
                .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.workers, WorkerConfig::default());
        assert!(config.email.is_none());
        assert!(!config.json_logs);
        assert!((config.sentry_sample_rate - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_database_url_fallback() {
        let config =
            ApiConfig::from_lookup(&lookup(&[("DATABASE_URL", "postgres://fallback/zb")])).unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/zb");

        let err = ApiConfig::from_lookup(&lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "API_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let err = ApiConfig::from_lookup(&lookup(&[
            ("DATABASE_URL", "postgres://localhost/zb"),
            ("API_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "API_PORT"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = ApiConfig::from_lookup(&lookup(&[
            ("DATABASE_URL", "postgres://localhost/zb"),
            ("TASK_WORKER_CONCURRENCY", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_full_email_group() {
        let config = ApiConfig::from_lookup(&lookup(&[
            ("DATABASE_URL", "postgres://localhost/zb"),
            ("LOG_FORMAT", "JSON"),
            ("SENDGRID_API_KEY", API_KEY),
            ("EMAIL_FROM_ADDRESS", "catalog@zebrands.mx"),
            ("EMAIL_PRODUCT_CHANGE_TEMPLATE_ID", "d-abc"),
        ]))
        .unwrap();

        assert!(config.json_logs);
        let email = config.email.unwrap();
        assert_eq!(email.base_url, DEFAULT_SENDGRID_BASE_URL);
        assert_eq!(email.from_address.as_str(), "catalog@zebrands.mx");
        assert!(!format!("{email:?}").contains(API_KEY));
    }

    #[test]
    fn test_partial_email_group_is_an_error() {
        let err = ApiConfig::from_lookup(&lookup(&[
            ("DATABASE_URL", "postgres://localhost/zb"),
            ("SENDGRID_API_KEY", API_KEY),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "EMAIL_FROM_ADDRESS"));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(validate_secret_strength("your-api-key-here", "TEST_VAR").is_err());
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").is_err());
        assert!(validate_secret_strength(API_KEY, "TEST_VAR").is_ok());
    }
}
