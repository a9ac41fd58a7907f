//! Configuration management

use anyhow::{Context, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// Base URL of the record-import endpoint
    pub import_api_url: String,

    /// Optional bearer token for the record-import endpoint
    pub import_api_token: Option<String>,

    /// Audit-log endpoint URL (activity entries are skipped when unset)
    pub audit_log_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let import_api_url = std::env::var("IMPORT_API_URL")
            .context("IMPORT_API_URL must be set")?;

        let import_api_token = std::env::var("IMPORT_API_TOKEN").ok();

        let audit_log_url = std::env::var("AUDIT_LOG_URL").ok();
        if audit_log_url.is_none() {
            tracing::warn!("AUDIT_LOG_URL not set — import activity entries will be skipped");
        }

        Ok(Self {
            nats_url,
            import_api_url,
            import_api_token,
            audit_log_url,
        })
    }
}
