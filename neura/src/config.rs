//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `NEURA_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **Defaults** - Every field has a default, so an empty or missing file is valid
//! 2. **YAML config file** - Base configuration (default: `config.yaml`)
//! 3. **Environment variables** - Variables prefixed with `NEURA_` override YAML values
//! 4. **Well-known variables** - `DATABASE_URL`, `JWT_SECRET`, `STRIPE_SECRET_KEY` and
//!    `OPENAI_API_KEY` override their nested counterparts if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `NEURA_RATE_LIMIT__REQUESTS_PER_MINUTE=120` sets the `rate_limit.requests_per_minute` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use neura::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}", config.bind_address());
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! NEURA_PORT=8080
//!
//! # Point at a different database file
//! DATABASE_URL="sqlite://data/neura.db"
//!
//! # Switch to Stripe billing
//! STRIPE_SECRET_KEY=sk_live_...
//!
//! # Override nested values
//! NEURA_BILLING__ENFORCE_USAGE_LIMITS=false
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "NEURA_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Deployment environment name, reported in logs only
    pub environment: String,
    /// Export traces over OTLP (configured through the standard `OTEL_*` variables)
    pub enable_otel_export: bool,
    /// HTML file served at `/dashboard`
    pub dashboard_path: PathBuf,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub billing: BillingConfig,
    pub payment: PaymentConfig,
    pub products: ProductsConfig,
    pub limits: LimitsConfig,

    // Well-known environment variables, folded into the nested sections by `load`
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    #[serde(skip_serializing)]
    pub stripe_secret_key: Option<String>,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
}

/// SQLite connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `sqlite://neura_saas.db` or `sqlite::memory:`
    pub url: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Create the database file on first start
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://neura_saas.db".to_string(),
            max_connections: 5,
            create_if_missing: true,
        }
    }
}

/// Authentication configuration for sessions and API keys.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 signing secret for session tokens
    pub jwt_secret: String,
    /// Session token lifetime
    #[serde(with = "humantime_serde")]
    pub jwt_expiry: Duration,
    /// Prefix that marks a bearer token as an API key rather than a session token
    pub api_key_prefix: String,
    pub password: PasswordConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "neura-ai-secret-change-in-production".to_string(),
            jwt_expiry: Duration::from_secs(24 * 60 * 60),
            api_key_prefix: "neura_".to_string(),
            password: PasswordConfig::default(),
        }
    }
}

/// Password validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB, secure for production)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2, secure for production)
    pub argon2_iterations: u32,
    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            argon2_memory_kib: 19456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: None,
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// Per-caller request rate limiting for the service endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Sustained requests per minute per caller
    pub requests_per_minute: u32,
    /// Maximum burst; defaults to `requests_per_minute`
    pub burst: Option<u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 60,
            burst: None,
        }
    }
}

/// Subscription and usage enforcement settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BillingConfig {
    /// Refuse service requests once the monthly plan quota is used up
    pub enforce_usage_limits: bool,
    /// Length of a subscription billing period
    #[serde(with = "humantime_serde")]
    pub billing_period: Duration,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            enforce_usage_limits: true,
            billing_period: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

/// Payment provider configuration.
///
/// Supports different payment providers via an enum. Credentials should be
/// set via environment variables for security.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentConfig {
    /// Stripe payment processing
    /// Set credentials via:
    /// - `STRIPE_SECRET_KEY` or `NEURA_PAYMENT__STRIPE__API_KEY` - Stripe secret API key
    Stripe(StripeConfig),
    /// Dummy payment provider for development and testing
    Dummy(DummyConfig),
}

impl Default for PaymentConfig {
    fn default() -> Self {
        PaymentConfig::Dummy(DummyConfig::default())
    }
}

/// Stripe payment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeConfig {
    /// Stripe API key (secret key starting with sk_)
    pub api_key: String,
    /// Stripe API base URL, overridable for testing
    #[serde(default = "default_stripe_base_url")]
    pub base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_stripe_base_url(),
        }
    }
}

fn default_stripe_base_url() -> String {
    "https://api.stripe.com".to_string()
}

/// Dummy payment configuration for testing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DummyConfig {
    /// Reject every charge with this message, to exercise failure paths
    pub fail_with: Option<String>,
}

/// Settings for the AI service endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductsConfig {
    /// Timeout for fetching the page under SEO audit
    #[serde(with = "humantime_serde")]
    pub seo_fetch_timeout: Duration,
    /// Reserved for model-backed analyses; the bundled services are deterministic
    pub openai_api_key: Option<String>,
}

impl Default for ProductsConfig {
    fn default() -> Self {
        Self {
            seo_fetch_timeout: Duration::from_secs(10),
            openai_api_key: None,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum accepted request body in bytes
    pub max_request_body: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body: 10 * 1024 * 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            enable_otel_export: false,
            dashboard_path: PathBuf::from("ui/saas-dashboard/index.html"),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            billing: BillingConfig::default(),
            payment: PaymentConfig::default(),
            products: ProductsConfig::default(),
            limits: LimitsConfig::default(),
            database_url: None,
            jwt_secret: None,
            stripe_secret_key: None,
            openai_api_key: None,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        if let Some(secret) = config.jwt_secret.take() {
            config.auth.jwt_secret = secret;
        }

        if let Some(api_key) = config.stripe_secret_key.take() {
            match &mut config.payment {
                PaymentConfig::Stripe(stripe) => stripe.api_key = api_key,
                PaymentConfig::Dummy(_) => config.payment = PaymentConfig::Stripe(StripeConfig::new(api_key)),
            }
        }

        if let Some(api_key) = config.openai_api_key.take() {
            config.products.openai_api_key = Some(api_key);
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.port == 0 {
            return Err(Error::Internal {
                operation: "Config validation: port cannot be 0".to_string(),
            });
        }

        if self.auth.jwt_secret.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: auth.jwt_secret cannot be empty. Set JWT_SECRET or NEURA_AUTH__JWT_SECRET.".to_string(),
            });
        }

        if self.auth.api_key_prefix.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: auth.api_key_prefix cannot be empty".to_string(),
            });
        }

        // Validate JWT expiry duration is reasonable
        if self.auth.jwt_expiry.as_secs() < 300 {
            return Err(Error::Internal {
                operation: "Config validation: JWT expiry duration is too short (minimum 5 minutes)".to_string(),
            });
        }

        if self.auth.jwt_expiry.as_secs() > 86400 * 30 {
            return Err(Error::Internal {
                operation: "Config validation: JWT expiry duration is too long (maximum 30 days)".to_string(),
            });
        }

        if self.auth.password.min_length < 1 || self.auth.password.min_length > self.auth.password.max_length {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: Invalid password configuration: min_length ({}) must be between 1 and max_length ({})",
                    self.auth.password.min_length, self.auth.password.max_length
                ),
            });
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        let has_wildcard = self.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        if self.rate_limit.enabled && self.rate_limit.requests_per_minute == 0 {
            return Err(Error::Internal {
                operation: "Config validation: rate_limit.requests_per_minute must be positive when rate limiting is enabled".to_string(),
            });
        }

        if self.rate_limit.burst == Some(0) {
            return Err(Error::Internal {
                operation: "Config validation: rate_limit.burst must be positive".to_string(),
            });
        }

        if self.billing.billing_period.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: billing.billing_period cannot be zero".to_string(),
            });
        }

        if let PaymentConfig::Stripe(stripe) = &self.payment {
            if stripe.api_key.trim().is_empty() {
                return Err(Error::Internal {
                    operation: "Config validation: payment.stripe.api_key cannot be empty. Set STRIPE_SECRET_KEY.".to_string(),
                });
            }
            if let Err(e) = Url::parse(&stripe.base_url) {
                return Err(Error::Internal {
                    operation: format!("Config validation: payment.stripe.base_url is not a valid URL: {e}"),
                });
            }
        }

        if self.limits.max_request_body == 0 {
            return Err(Error::Internal {
                operation: "Config validation: limits.max_request_body cannot be 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("NEURA_").ignore(&["config"]).split("__"))
            // Well-known unprefixed variables
            .merge(Env::raw().only(&["DATABASE_URL", "JWT_SECRET", "STRIPE_SECRET_KEY", "OPENAI_API_KEY"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
