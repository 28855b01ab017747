use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::services::order_lifecycle::FulfillmentPolicy;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 5000;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.razorpay.com";
const DEV_DEFAULT_JWT_SECRET: &str = "pizzeria_development_secret_do_not_ship_to_production";

/// Payment gateway credentials and settings.
///
/// The gateway client is built once at startup from this section. When
/// `key_id` or `key_secret` is missing the payment endpoints answer with
/// `503 Service Unavailable` instead of failing the whole process.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    /// Base URL of the Razorpay-compatible REST API
    #[serde(default = "default_gateway_base_url")]
    #[validate(url)]
    pub gateway_base_url: String,

    /// Public key id, returned to clients alongside payment intents
    #[serde(default)]
    pub key_id: Option<String>,

    /// Shared secret used for HTTP basic auth and signature verification
    #[serde(default)]
    pub key_secret: Option<String>,

    /// ISO 4217 currency for payment intents
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    /// Request timeout for gateway calls (seconds)
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gateway_base_url: default_gateway_base_url(),
            key_id: None,
            key_secret: None,
            currency: default_currency(),
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

impl PaymentConfig {
    /// Returns `(key_id, key_secret)` when both are configured and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.key_id.as_deref(), self.key_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
                Some((id, secret))
            }
            _ => None,
        }
    }
}

/// Outbound notification settings.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    /// Endpoint receiving signed order notifications; log-only when unset
    #[serde(default)]
    #[validate(url)]
    pub webhook_url: Option<String>,

    /// HMAC secret for the `X-Pizzeria-Signature` header
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key
    #[validate(custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// JWT expiration time in seconds
    #[validate(range(min = 300, max = 2_592_000))]
    pub jwt_expiration: usize,

    /// JWT issuer name
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Capacity of the notification event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// How administrators may move an order's fulfillment status
    #[serde(default)]
    pub fulfillment_policy: FulfillmentPolicy,

    /// Payment gateway settings
    #[serde(default)]
    #[validate]
    pub payment: PaymentConfig,

    /// Notification delivery settings
    #[serde(default)]
    #[validate]
    pub notifications: NotificationConfig,
}

impl AppConfig {
    /// Creates a configuration with defaults for every optional section.
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            event_channel_capacity: default_event_channel_capacity(),
            fulfillment_policy: FulfillmentPolicy::default(),
            payment: PaymentConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Parsed, non-empty CORS origins
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Cross-field rules that the derive attributes cannot express.
    fn validate_deployment(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            errors.add(
                "jwt_secret",
                config_error(
                    "jwt_secret_dev_default",
                    "the development JWT secret is only accepted when environment = development",
                ),
            );
        }

        if self.is_production() && self.payment.credentials().is_none() {
            errors.add(
                "payment",
                config_error(
                    "payment_credentials_missing",
                    "production needs APP__PAYMENT__KEY_ID and APP__PAYMENT__KEY_SECRET",
                ),
            );
        }

        let webhook_secret_missing = self
            .notifications
            .webhook_secret
            .as_deref()
            .map_or(true, |s| s.trim().is_empty());
        if self.notifications.webhook_url.is_some() && webhook_secret_missing {
            errors.add(
                "notifications",
                config_error(
                    "webhook_secret_missing",
                    "notifications.webhook_url is set without notifications.webhook_secret",
                ),
            );
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("could not assemble configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_gateway_base_url() -> String {
    DEFAULT_GATEWAY_BASE_URL.to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_auth_issuer() -> String {
    "pizzeria-api".to_string()
}

fn default_auth_audience() -> String {
    "pizzeria-clients".to_string()
}

fn config_error(field: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(field);
    err.message = Some(message.into());
    err
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(config_error(
            "log_level",
            "log_level must be trace, debug, info, warn or error",
        )),
    }
}

/// Rejects secrets that are short, a single repeated character, or built
/// around an obvious placeholder.
fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let secret = secret.trim();
    if secret.len() < 32 {
        return Err(config_error(
            "jwt_secret",
            "jwt_secret needs at least 32 characters",
        ));
    }

    let mut chars = secret.chars();
    let head = chars.next();
    if chars.all(|c| Some(c) == head) {
        return Err(config_error(
            "jwt_secret",
            "jwt_secret must not repeat one character",
        ));
    }

    let lowered = secret.to_ascii_lowercase();
    if ["changeme", "password", "12345", "secret-key"]
        .iter()
        .any(|placeholder| lowered.contains(placeholder))
    {
        return Err(config_error(
            "jwt_secret",
            "jwt_secret looks like a placeholder; generate a random value",
        ));
    }
    Ok(())
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity > 0 {
        Ok(())
    } else {
        Err(config_error(
            "event_channel_capacity",
            "event_channel_capacity must be positive",
        ))
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("pizzeria_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Builds the [`AppConfig`] for the current `RUN_ENV` (default `development`).
///
/// Later sources win: built-in defaults, `config/default.toml`,
/// `config/{RUN_ENV}.toml`, then `APP__*` environment variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!(environment = %run_env, "Loading pizzeria configuration");

    if !Path::new(CONFIG_DIR).is_dir() {
        info!(dir = CONFIG_DIR, "No config directory; using defaults and APP__* variables");
    }

    let mut builder = Config::builder()
        .set_default("database_url", "sqlite://pizzeria.db?mode=rwc")?
        .set_default("jwt_expiration", 7 * 24 * 3600)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?;

    // Only a development run may fall back to the bundled secret.
    if run_env.eq_ignore_ascii_case(DEFAULT_ENV) {
        builder = builder.set_default("jwt_secret", DEV_DEFAULT_JWT_SECRET)?;
    }

    let layered = builder
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_env}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if layered.get_string("jwt_secret").is_err() {
        error!(environment = %run_env, "APP__JWT_SECRET is not set");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret (set APP__JWT_SECRET)".into(),
        )));
    }

    let cfg: AppConfig = layered.try_deserialize()?;
    if let Err(errors) = cfg.validate().and_then(|_| cfg.validate_deployment()) {
        error!(?errors, "Rejected configuration");
        return Err(AppConfigError::Validation(errors));
    }

    info!(
        port = cfg.port,
        fulfillment_policy = ?cfg.fulfillment_policy,
        payments = cfg.payment.credentials().is_some(),
        "Configuration loaded"
    );
    Ok(cfg)
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "a_long_and_random_jwt_secret_for_unit_tests_9f8e7d".into(),
            3600,
            "127.0.0.1".into(),
            5000,
            "production".into(),
        )
    }

    #[test]
    fn production_requires_payment_credentials() {
        let cfg = base_config();
        assert!(cfg.validate_deployment().is_err());
    }

    #[test]
    fn production_with_credentials_passes() {
        let mut cfg = base_config();
        cfg.payment.key_id = Some("rzp_test_key".into());
        cfg.payment.key_secret = Some("rzp_test_secret".into());
        assert!(cfg.validate_deployment().is_ok());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn dev_secret_rejected_outside_development() {
        let mut cfg = base_config();
        cfg.environment = "staging".into();
        cfg.jwt_secret = DEV_DEFAULT_JWT_SECRET.into();
        let errors = cfg.validate_deployment().unwrap_err();
        assert!(errors.field_errors().contains_key("jwt_secret"));
    }

    #[test]
    fn webhook_url_requires_secret() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.notifications.webhook_url = Some("https://hooks.example.com/orders".into());
        assert!(cfg.validate_deployment().is_err());

        cfg.notifications.webhook_secret = Some("whsec".into());
        assert!(cfg.validate_deployment().is_ok());
    }

    #[test]
    fn short_jwt_secret_fails_validation() {
        let mut cfg = base_config();
        cfg.jwt_secret = "short".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("jwt_secret"));
    }

    #[test]
    fn zero_channel_capacity_fails_validation() {
        let mut cfg = base_config();
        cfg.event_channel_capacity = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn cors_origins_are_trimmed() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some(" https://a.example , ,https://b.example".into());
        assert_eq!(
            cfg.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn credentials_ignore_blank_values() {
        let mut payment = PaymentConfig::default();
        payment.key_id = Some("rzp_key".into());
        payment.key_secret = Some("   ".into());
        assert!(payment.credentials().is_none());
        assert_eq!(payment.currency, "INR");
    }
}
