//! Configuration module
//!
//! This module provides configuration structures for the API service,
//! including database, authentication, upload, ingestion-queue, and
//! content-generation settings.

use std::env;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;

/// Base configuration shared by server-facing settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub environment: String,
    pub log_json: bool,
}

/// Learning-engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Upload handling
    pub upload_dir: String,
    pub max_upload_size_bytes: usize,
    pub upload_allowed_extensions: Vec<String>,
    // Ingestion queue
    pub ingestion_queue_size: usize,
    pub ingestion_max_concurrent: usize,
    // Content-generation collaborator (Anthropic-compatible messages API)
    pub anthropic_api_key: Option<String>,
    pub generation_api_url: String,
    pub generation_model: String,
    pub generation_max_tokens: u32,
    pub generation_timeout_seconds: u64,
    // Billing
    pub trial_days: i64,
    pub checkout_base_url: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<EngineConfig>);

impl Config {
    fn as_engine(&self) -> &EngineConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.as_engine()
            .base
            .environment
            .to_lowercase()
            .eq("production")
            || self.as_engine().base.environment.to_lowercase().eq("prod")
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = EngineConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_engine().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.as_engine().base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.as_engine().base.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.as_engine().base.jwt_expiry_hours
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_engine().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_engine().base.environment
    }

    pub fn log_json(&self) -> bool {
        self.as_engine().base.log_json
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_engine().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_engine().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> &str {
        &self.as_engine().database_url
    }

    pub fn upload_dir(&self) -> &str {
        &self.as_engine().upload_dir
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.as_engine().max_upload_size_bytes
    }

    pub fn upload_allowed_extensions(&self) -> &[String] {
        &self.as_engine().upload_allowed_extensions
    }

    pub fn ingestion_queue_size(&self) -> usize {
        self.as_engine().ingestion_queue_size
    }

    pub fn ingestion_max_concurrent(&self) -> usize {
        self.as_engine().ingestion_max_concurrent
    }

    pub fn anthropic_api_key(&self) -> Option<&str> {
        self.as_engine().anthropic_api_key.as_deref()
    }

    pub fn generation_api_url(&self) -> &str {
        &self.as_engine().generation_api_url
    }

    pub fn generation_model(&self) -> &str {
        &self.as_engine().generation_model
    }

    pub fn generation_max_tokens(&self) -> u32 {
        self.as_engine().generation_max_tokens
    }

    pub fn generation_timeout_seconds(&self) -> u64 {
        self.as_engine().generation_timeout_seconds
    }

    pub fn trial_days(&self) -> i64 {
        self.as_engine().trial_days
    }

    pub fn checkout_base_url(&self) -> &str {
        &self.as_engine().checkout_base_url
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const MAX_UPLOAD_SIZE_MB: usize = 25;
        const INGESTION_QUEUE_SIZE: usize = 100;
        const INGESTION_MAX_CONCURRENT: usize = 4;
        const GENERATION_MAX_TOKENS: u32 = 4096;
        const GENERATION_TIMEOUT_SECS: u64 = 120;
        const TRIAL_DAYS: i64 = 7;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let upload_allowed_extensions = env::var("UPLOAD_ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "pdf,txt,md,srt,vtt".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| JWT_EXPIRY_HOURS.to_string())
                .parse()
                .unwrap_or(JWT_EXPIRY_HOURS),
            environment: environment.clone(),
            log_json: env::var("LOG_JSON")
                .unwrap_or_else(|_| is_production.to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(is_production),
        };

        let config = EngineConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            upload_allowed_extensions,
            ingestion_queue_size: env::var("INGESTION_QUEUE_SIZE")
                .unwrap_or_else(|_| INGESTION_QUEUE_SIZE.to_string())
                .parse()
                .unwrap_or(INGESTION_QUEUE_SIZE),
            ingestion_max_concurrent: env::var("INGESTION_MAX_CONCURRENT")
                .unwrap_or_else(|_| INGESTION_MAX_CONCURRENT.to_string())
                .parse()
                .unwrap_or(INGESTION_MAX_CONCURRENT),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok().filter(|s| !s.is_empty()),
            generation_api_url: env::var("GENERATION_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string()),
            generation_model: env::var("GENERATION_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            generation_max_tokens: env::var("GENERATION_MAX_TOKENS")
                .unwrap_or_else(|_| GENERATION_MAX_TOKENS.to_string())
                .parse()
                .unwrap_or(GENERATION_MAX_TOKENS),
            generation_timeout_seconds: env::var("GENERATION_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| GENERATION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(GENERATION_TIMEOUT_SECS),
            trial_days: env::var("TRIAL_DAYS")
                .unwrap_or_else(|_| TRIAL_DAYS.to_string())
                .parse()
                .unwrap_or(TRIAL_DAYS),
            checkout_base_url: env::var("CHECKOUT_BASE_URL")
                .unwrap_or_else(|_| "https://billing.glossa.app/checkout".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        let is_production = self.base.environment.to_lowercase() == "production"
            || self.base.environment.to_lowercase() == "prod";
        if is_production && self.anthropic_api_key.is_none() {
            return Err(anyhow::anyhow!(
                "ANTHROPIC_API_KEY must be set in production for content generation"
            ));
        }

        if self.ingestion_max_concurrent == 0 {
            return Err(anyhow::anyhow!(
                "INGESTION_MAX_CONCURRENT must be at least 1"
            ));
        }

        Ok(())
    }
}
