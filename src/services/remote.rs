//! Record-import endpoint client
//!
//! The remote store accepts one batch of projected rows per call and reports
//! counts plus per-row errors. Duplicate conflicts are special: the endpoint
//! returns a structured list of already-existing identifiers, which is
//! authoritative; older deployments only put "already exist" wording in the
//! error message, so that substring check is kept as a fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BatchResponse, ProjectedRow};

#[derive(Debug, Error)]
pub enum ImportApiError {
    /// One or more rows reference records the server already holds. Aborts
    /// the whole run.
    #[error("{} records already exist", .existing.len())]
    Duplicate { existing: Vec<String> },

    /// The endpoint rejected the batch for any non-duplicate reason. The
    /// batch counts as failed but the run continues.
    #[error("import endpoint rejected batch: {0}")]
    Rejected(String),

    #[error("import endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ImportApiError {
    pub fn is_duplicate_conflict(&self) -> bool {
        matches!(self, ImportApiError::Duplicate { .. })
    }
}

/// Seam to the remote import endpoint.
#[async_trait]
pub trait RecordImporter: Send + Sync {
    async fn import_batch(&self, rows: &[ProjectedRow]) -> Result<BatchResponse, ImportApiError>;
}

#[derive(Serialize)]
struct BatchPayload<'a> {
    rows: &'a [ProjectedRow],
}

/// Error payload of the import endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImportErrorBody {
    error: Option<String>,
    existing_emails: Vec<String>,
}

/// Turn a non-success response body into the right error variant. The
/// structured identifier list wins; the message substring is legacy fallback.
fn classify_failure(status: reqwest::StatusCode, body: ImportErrorBody) -> ImportApiError {
    if !body.existing_emails.is_empty() {
        return ImportApiError::Duplicate {
            existing: body.existing_emails,
        };
    }

    let message = body.error.unwrap_or_else(|| status.to_string());
    if message.to_lowercase().contains("already exist") {
        return ImportApiError::Duplicate { existing: vec![] };
    }

    ImportApiError::Rejected(message)
}

/// HTTP client for the record-import endpoint.
pub struct HttpRecordImporter {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpRecordImporter {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Prospecta/1.0 (https://prospecta.io)")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        }
    }
}

#[async_trait]
impl RecordImporter for HttpRecordImporter {
    async fn import_batch(&self, rows: &[ProjectedRow]) -> Result<BatchResponse, ImportApiError> {
        let url = format!("{}/contacts/import", self.base_url);

        let mut request = self.client.post(&url).json(&BatchPayload { rows });
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<BatchResponse>().await?);
        }

        let body: ImportErrorBody = response.json().await.unwrap_or_default();
        Err(classify_failure(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_structured_duplicate_signal_is_authoritative() {
        let body = ImportErrorBody {
            error: Some("validation failed".to_string()),
            existing_emails: vec!["dup@x.com".to_string()],
        };
        let err = classify_failure(StatusCode::CONFLICT, body);
        match err {
            ImportApiError::Duplicate { existing } => {
                assert_eq!(existing, vec!["dup@x.com".to_string()]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_message_substring_fallback() {
        let body = ImportErrorBody {
            error: Some("Some contacts already exist".to_string()),
            existing_emails: vec![],
        };
        let err = classify_failure(StatusCode::CONFLICT, body);
        assert!(err.is_duplicate_conflict());
    }

    #[test]
    fn test_generic_failure_is_not_a_conflict() {
        let body = ImportErrorBody {
            error: Some("rate limited".to_string()),
            existing_emails: vec![],
        };
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, body);
        assert!(!err.is_duplicate_conflict());
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_missing_error_body_falls_back_to_status() {
        let err = classify_failure(StatusCode::BAD_GATEWAY, ImportErrorBody::default());
        assert!(!err.is_duplicate_conflict());
    }
}
