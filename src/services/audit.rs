//! Audit-log collaborator
//!
//! After a successful import the worker records one activity entry carrying
//! only the final imported total. The call is best-effort: a failure is
//! logged and swallowed, never surfaced to the user.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_import(&self, imported_total: u32) -> Result<()>;
}

#[derive(Serialize)]
struct ActivityPayload {
    total: u32,
}

/// HTTP client for the audit-log endpoint.
pub struct HttpAuditLog {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuditLog {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Prospecta/1.0 (https://prospecta.io)")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl AuditSink for HttpAuditLog {
    async fn record_import(&self, imported_total: u32) -> Result<()> {
        let url = format!("{}/activity/import", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ActivityPayload {
                total: imported_total,
            })
            .send()
            .await
            .context("Failed to send audit-log request")?;

        if !response.status().is_success() {
            anyhow::bail!("audit-log endpoint returned {}", response.status());
        }
        Ok(())
    }
}

/// Used when no audit-log endpoint is configured.
pub struct NoopAuditLog;

#[async_trait]
impl AuditSink for NoopAuditLog {
    async fn record_import(&self, imported_total: u32) -> Result<()> {
        debug!("audit log disabled, dropping import total {}", imported_total);
        Ok(())
    }
}

/// Pick the audit sink for the configured environment.
pub fn create_audit_sink(audit_url: Option<&str>) -> Arc<dyn AuditSink> {
    match audit_url {
        Some(url) => Arc::new(HttpAuditLog::new(url)),
        None => Arc::new(NoopAuditLog),
    }
}
