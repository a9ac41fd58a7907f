//! Outcome presentation
//!
//! Pure rendering of the final [`ImportOutcome`] into the summary shape the
//! UI consumes, with long identifier and error lists cut to a short preview
//! plus an "and N more" count.

use crate::defaults::SUMMARY_PREVIEW_LEN;
use crate::types::{ImportOutcome, ImportPhase, ImportSummary};

fn preview<T: Clone>(items: &[T]) -> (Vec<T>, usize) {
    let head: Vec<T> = items.iter().take(SUMMARY_PREVIEW_LEN).cloned().collect();
    (head, items.len().saturating_sub(SUMMARY_PREVIEW_LEN))
}

fn headline(outcome: &ImportOutcome) -> String {
    if let Some(ref message) = outcome.message {
        return message.clone();
    }

    match outcome.phase {
        ImportPhase::Idle => "no import has run".to_string(),
        ImportPhase::Running => "import in progress".to_string(),
        ImportPhase::AbortedOnConflict => format!(
            "{} records already exist; import aborted",
            outcome.existing_emails.len()
        ),
        ImportPhase::Completed => {
            let mut parts = vec![format!("{} contacts imported", outcome.imported)];
            if outcome.companies_created > 0 || outcome.companies_updated > 0 {
                parts.push(format!(
                    "{} companies created, {} updated",
                    outcome.companies_created, outcome.companies_updated
                ));
            }
            if outcome.failed > 0 {
                parts.push(format!("{} rows failed", outcome.failed));
            }
            if !outcome.existing_emails.is_empty() {
                parts.push(format!(
                    "{} skipped as duplicates",
                    outcome.existing_emails.len()
                ));
            }
            parts.join(", ")
        }
    }
}

/// Build the user-facing summary of a finished (or aborted) run.
pub fn summarize(outcome: &ImportOutcome) -> ImportSummary {
    let (duplicate_preview, duplicate_more) = preview(&outcome.existing_emails);
    let (imported_preview, imported_more) = preview(&outcome.imported_emails);
    let (error_preview, error_more) = preview(&outcome.errors);

    ImportSummary {
        phase: outcome.phase,
        imported: outcome.imported,
        companies_created: outcome.companies_created,
        companies_updated: outcome.companies_updated,
        failed: outcome.failed,
        skipped: outcome.existing_emails.len() as u32,
        duplicate_preview,
        duplicate_more,
        imported_preview,
        imported_more,
        error_preview,
        error_more,
        message: headline(outcome),
    }
}
