//! Application configuration.
//!
//! Settings are layered: built-in defaults, then `config/default.toml`, then
//! an environment-specific file, then `APP__`-prefixed environment variables.
//! The loaded configuration is validated before the server starts.

use std::env;

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_ENV: &str = "development";
pub const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Shipped in `config/default.toml` so development works out of the box.
/// Any other environment must override it.
pub const DEV_DEFAULT_TOKEN_SECRET: &str = "dev-only-payment-token-secret-0123456789";

/// Payment policy limits. All fields have defaults so a bare deployment
/// gets the documented behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub currencies: Vec<String>,
    pub session_ttl_minutes: i64,
    pub max_retries: u32,
    pub sweep_interval_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_amount: dec!(1),
            max_amount: dec!(10000),
            currencies: vec!["EUR".to_string(), "USD".to_string(), "TRY".to_string()],
            session_ttl_minutes: 30,
            max_retries: 3,
            sweep_interval_secs: 300,
        }
    }
}

impl PolicyConfig {
    pub fn allows_currency(&self, currency: &str) -> bool {
        self.currencies
            .iter()
            .any(|c| c.eq_ignore_ascii_case(currency))
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    #[validate(custom = "validate_log_level")]
    pub log_level: String,
    pub log_json: bool,
    /// Key for the card tokenizer's HMAC.
    #[validate(length(min = 32))]
    pub token_secret: String,
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Checks that fall outside what the `validator` derive can express.
    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && self.token_secret == DEV_DEFAULT_TOKEN_SECRET {
            let mut err = ValidationError::new("dev_token_secret");
            err.message =
                Some("the development token secret must be overridden outside development".into());
            errors.add("token_secret", err);
        }
        if self.policy.min_amount <= Decimal::ZERO {
            let mut err = ValidationError::new("min_amount_not_positive");
            err.message = Some("policy.min_amount must be positive".into());
            errors.add("policy", err);
        }
        if self.policy.max_amount <= self.policy.min_amount {
            let mut err = ValidationError::new("max_amount_not_above_min");
            err.message = Some("policy.max_amount must exceed policy.min_amount".into());
            errors.add("policy", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new("invalid_log_level")),
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration load error: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation error: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Loads application configuration.
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting the config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    // token_secret has no built-in default. It must come from a config file
    // or the environment.
    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // Check for token_secret before deserialization to give a clear error
    if config.get_string("token_secret").is_err() {
        error!("Tokenizer secret is not configured. Set APP__TOKEN_SECRET with a secure random string (minimum 32 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "token_secret is required but not configured. Set APP__TOKEN_SECRET environment variable.".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    Ok(app_config)
}

/// Installs the global tracing subscriber. `RUST_LOG` overrides the
/// configured level. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(level: &str, json: bool) {
    let default_directive = format!("payment_sessions_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter_directive)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter_directive)
            .try_init();
    }
}
