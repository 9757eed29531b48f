use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_SESSION_SECRET: &str =
    "this_is_a_development_session_secret_that_is_at_least_64_characters_long";

/// AI provider configuration
///
/// The primary provider speaks an OpenRouter-compatible chat-completions API;
/// when it is unavailable or unconfigured the service falls back to a local
/// Ollama-compatible `/api/generate` endpoint.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    /// API key for the primary provider; chat falls straight through to the
    /// fallback when unset
    #[serde(default)]
    pub openrouter_api_key: Option<String>,

    /// Base URL of the primary provider
    #[serde(default = "default_openrouter_base_url")]
    pub openrouter_base_url: String,

    /// Model identifier sent to the primary provider
    #[serde(default = "default_openrouter_model")]
    pub openrouter_model: String,

    /// Base URL of the local fallback provider
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    /// Model identifier for the fallback provider
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    /// Per-call timeout (seconds) for provider requests
    #[serde(default = "default_ai_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openrouter_api_key: None,
            openrouter_base_url: default_openrouter_base_url(),
            openrouter_model: default_openrouter_model(),
            ollama_base_url: default_ollama_base_url(),
            ollama_model: default_ollama_model(),
            request_timeout_secs: default_ai_timeout_secs(),
        }
    }
}

/// Image store configuration (S3/Supabase-style object API)
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Base URL of the object storage API
    #[serde(default = "default_storage_base_url")]
    pub base_url: String,

    /// Bucket holding customer-uploaded damage images
    #[serde(default = "default_storage_bucket")]
    pub bucket: String,

    /// Service key used for authenticated storage calls
    #[serde(default)]
    pub service_key: Option<String>,

    /// Per-call timeout (seconds) for storage requests
    #[serde(default = "default_storage_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_storage_base_url(),
            bucket: default_storage_bucket(),
            service_key: None,
            request_timeout_secs: default_storage_timeout_secs(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Session token secret (minimum 64 characters)
    #[validate(length(min = 64), custom = "validate_session_secret")]
    pub session_secret: String,

    /// Session token lifetime in seconds
    #[serde(default = "default_session_expiration")]
    pub session_expiration: u64,

    /// Session token issuer
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// Session token audience
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Comma-separated list of admin emails allowed into the dashboard.
    /// Injected configuration rather than a compiled-in constant so the list
    /// can rotate without a deploy.
    #[serde(default)]
    pub admin_emails: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default = "default_false_bool")]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Request-level timeout (seconds) applied to every HTTP request;
    /// an overrun is reported to the caller as retryable, never as a
    /// partial mutation
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes (multipart uploads included)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Maximum number of files accepted by a single upload request
    #[serde(default = "default_max_upload_files")]
    pub max_upload_files: usize,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// AI provider configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Image store configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Parsed admin allow-list, lowercased for case-insensitive matching.
    pub fn admin_allowlist(&self) -> HashSet<String> {
        self.admin_emails
            .split(',')
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty())
            .collect()
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.session_secret.trim() == DEV_DEFAULT_SESSION_SECRET {
            let mut err = ValidationError::new("session_secret_default_dev");
            err.message = Some(
                "The bundled development session secret must not be used outside development. Set APP__SESSION_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("session_secret", err);
        }

        if !self.is_development() && self.admin_allowlist().is_empty() {
            let mut err = ValidationError::new("admin_emails_required");
            err.message = Some(
                "No admin emails configured; every admin endpoint would reject. Set APP__ADMIN_EMAILS.".into(),
            );
            errors.add("admin_emails", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_false_bool() -> bool {
    false
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}

fn default_max_upload_files() -> usize {
    10
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_session_expiration() -> u64 {
    30 * 24 * 60 * 60
}

fn default_auth_issuer() -> String {
    "autoworx-api".to_string()
}

fn default_auth_audience() -> String {
    "autoworx-admin".to_string()
}

fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api".to_string()
}

fn default_openrouter_model() -> String {
    "arcee-ai/trinity-large-preview:free".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:1b".to_string()
}

fn default_ai_timeout_secs() -> u64 {
    60
}

fn default_storage_base_url() -> String {
    "http://localhost:54321/storage/v1".to_string()
}

fn default_storage_bucket() -> String {
    "damage-images".to_string()
}

fn default_storage_timeout_secs() -> u64 {
    15
}

fn validate_session_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 64 {
        let mut err = ValidationError::new("session_secret");
        err.message =
            Some("Session secret must be at least 64 characters for adequate security".into());
        return Err(err);
    }

    // Reject trivially weak secrets (repeated characters, common patterns)
    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("session_secret");
            err.message = Some("Session secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "default", "12345", "abcdef"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("session_secret");
        err.message = Some(
            "Session secret appears to be weak; use a cryptographically strong random string"
                .into(),
        );
        return Err(err);
    }

    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("session_secret");
        err.message = Some(
            "Session secret must have at least 10 unique characters for adequate entropy".into(),
        );
        return Err(err);
    }

    Ok(())
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("autoworx_api={},tower_http=debug", level);
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

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // NOTE: session_secret has no default outside development - it MUST be
    // provided via environment variable or config file.
    let mut builder = Config::builder()
        .set_default("database_url", "sqlite://autoworx.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    if run_env.eq_ignore_ascii_case(DEFAULT_ENV) {
        builder = builder.set_default("session_secret", DEV_DEFAULT_SESSION_SECRET)?;
    }

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // Check for session_secret before deserialization to provide a clear error message
    if config.get_string("session_secret").is_err() {
        error!("Session secret is not configured. Set APP__SESSION_SECRET with a secure random string (minimum 64 characters).");
        error!("Generate a secure secret with: openssl rand -base64 64");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "session_secret is required but not configured. Set APP__SESSION_SECRET environment variable."
                .into(),
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

    info!("Configuration loaded successfully");
    Ok(app_config)
}
