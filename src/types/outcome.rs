//! Import outcome accumulation
//!
//! [`ImportOutcome`] is the single mutable state of a chunked import run. It
//! is owned by the orchestrator and folded forward one batch at a time; the
//! fold itself is pure so it can be tested without any network or transport
//! in the picture.

use serde::{Deserialize, Serialize};

/// One row the import endpoint rejected. `row` is relative to the original
/// file once the outcome has absorbed it, not to the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: u32,
    pub email: String,
    pub error: String,
}

/// Successful response of the import endpoint for one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    #[serde(default)]
    pub imported: u32,
    #[serde(default)]
    pub companies_created: u32,
    #[serde(default)]
    pub companies_updated: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub existing_emails: Vec<String>,
    #[serde(default)]
    pub imported_emails: Vec<String>,
    #[serde(default)]
    pub errors: Vec<RowError>,
}

/// State of the import pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportPhase {
    Idle,
    Running,
    AbortedOnConflict,
    Completed,
}

/// Running totals of a chunked import, plus phase and 0-100 progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub phase: ImportPhase,
    pub progress: u8,
    pub imported: u32,
    pub companies_created: u32,
    pub companies_updated: u32,
    pub failed: u32,
    pub errors: Vec<RowError>,
    pub existing_emails: Vec<String>,
    pub imported_emails: Vec<String>,
    /// Human-readable note for terminal states (no-result runs, conflicts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ImportOutcome {
    /// Fresh accumulator for a run that is about to start.
    pub fn running() -> Self {
        Self {
            phase: ImportPhase::Running,
            progress: 0,
            imported: 0,
            companies_created: 0,
            companies_updated: 0,
            failed: 0,
            errors: Vec::new(),
            existing_emails: Vec::new(),
            imported_emails: Vec::new(),
            message: None,
        }
    }

    /// Fold one successful batch response into the totals.
    ///
    /// Server row numbers are batch-relative; they are rebased here by
    /// `batch_index * cap` so every reported error points at the original
    /// file row regardless of batch size.
    pub fn absorb(&mut self, batch_index: usize, cap: usize, response: &BatchResponse) {
        self.imported += response.imported;
        self.companies_created += response.companies_created;
        self.companies_updated += response.companies_updated;
        self.failed += response.failed;

        let base = (batch_index * cap) as u32;
        self.errors.extend(response.errors.iter().map(|e| RowError {
            row: e.row + base,
            email: e.email.clone(),
            error: e.error.clone(),
        }));

        self.existing_emails
            .extend(response.existing_emails.iter().cloned());
        self.imported_emails
            .extend(response.imported_emails.iter().cloned());
    }

    /// Count an entire batch as failed after a non-conflict submission error,
    /// with one synthetic error entry anchored at the batch's first data row.
    pub fn record_batch_failure(
        &mut self,
        batch_index: usize,
        cap: usize,
        batch_len: usize,
        message: &str,
    ) {
        self.failed += batch_len as u32;
        self.errors.push(RowError {
            row: (batch_index * cap) as u32 + 1,
            email: String::new(),
            error: format!("batch rejected: {}", message),
        });
    }

    /// Monotonic progress update; late smaller values never regress the bar.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    pub fn abort_on_conflict(&mut self, existing: Vec<String>) {
        self.phase = ImportPhase::AbortedOnConflict;
        self.message = Some(format!(
            "{} records already exist; import aborted",
            existing.len()
        ));
        self.existing_emails.extend(existing);
    }

    pub fn mark_completed(&mut self) {
        self.phase = ImportPhase::Completed;
    }

    /// A run that imported nothing is reported as failed and returns the
    /// pipeline to idle.
    pub fn mark_no_result(&mut self) {
        self.phase = ImportPhase::Idle;
        self.message = Some("import finished without importing any records".to_string());
    }
}
