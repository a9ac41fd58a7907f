//! Chunked import orchestration
//!
//! The engine owns the only long-running, stateful phase of the pipeline. It
//! partitions projected rows into contiguous capped batches and submits them
//! strictly one at a time; a conflict detected in batch *i* must abort
//! before batch *i+1* is ever sent. All accumulation goes through the pure
//! reducer on [`ImportOutcome`]; this loop only sequences network calls and
//! progress publishes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::defaults::{IMPORT_BATCH_CAP, PROGRESS_NETWORK_SHARE};
use crate::types::{ImportOutcome, ImportPhase, ProjectedRow};

use super::audit::AuditSink;
use super::remote::{ImportApiError, RecordImporter};

/// Receives phase/progress updates, published before every blocking network
/// call so a slow endpoint never leaves the user without feedback.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn publish(&self, phase: ImportPhase, progress: u8);
}

pub struct ImportEngine {
    importer: Arc<dyn RecordImporter>,
    audit: Arc<dyn AuditSink>,
    batch_cap: usize,
}

impl ImportEngine {
    pub fn new(importer: Arc<dyn RecordImporter>, audit: Arc<dyn AuditSink>) -> Self {
        Self::with_batch_cap(importer, audit, IMPORT_BATCH_CAP)
    }

    pub fn with_batch_cap(
        importer: Arc<dyn RecordImporter>,
        audit: Arc<dyn AuditSink>,
        batch_cap: usize,
    ) -> Self {
        assert!(batch_cap > 0, "batch cap must be positive");
        Self {
            importer,
            audit,
            batch_cap,
        }
    }

    pub fn total_batches(&self, row_count: usize) -> usize {
        row_count.div_ceil(self.batch_cap)
    }

    /// Run the chunked phase to completion and return the final outcome.
    pub async fn run(&self, rows: Vec<ProjectedRow>, progress: &dyn ProgressSink) -> ImportOutcome {
        let total_batches = self.total_batches(rows.len());
        let mut outcome = ImportOutcome::running();

        for (index, batch) in rows.chunks(self.batch_cap).enumerate() {
            let pct = (index * PROGRESS_NETWORK_SHARE as usize / total_batches) as u8;
            outcome.set_progress(pct);
            progress.publish(ImportPhase::Running, outcome.progress).await;

            debug!(
                "submitting batch {}/{} ({} rows)",
                index + 1,
                total_batches,
                batch.len()
            );

            match self.importer.import_batch(batch).await {
                Ok(response) => outcome.absorb(index, self.batch_cap, &response),
                Err(ImportApiError::Duplicate { existing }) => {
                    warn!(
                        "batch {}/{} hit {} existing records, aborting run",
                        index + 1,
                        total_batches,
                        existing.len()
                    );
                    outcome.abort_on_conflict(existing);
                    break;
                }
                Err(err) => {
                    warn!("batch {}/{} failed: {}", index + 1, total_batches, err);
                    outcome.record_batch_failure(index, self.batch_cap, batch.len(), &err.to_string());
                }
            }
        }

        outcome.set_progress(100);

        if outcome.phase != ImportPhase::AbortedOnConflict {
            if outcome.imported == 0 {
                outcome.mark_no_result();
            } else {
                outcome.mark_completed();
                // Best-effort activity entry; never blocks or fails the run.
                let audit = Arc::clone(&self.audit);
                let total = outcome.imported;
                tokio::spawn(async move {
                    if let Err(e) = audit.record_import(total).await {
                        warn!("failed to record import activity: {}", e);
                    }
                });
            }
        }

        progress.publish(outcome.phase, outcome.progress).await;

        info!(
            "import run finished: {:?}, {} imported, {} failed, {} duplicates",
            outcome.phase,
            outcome.imported,
            outcome.failed,
            outcome.existing_emails.len()
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::types::{BatchResponse, RowError};

    /// Importer that replays a scripted response per batch and records the
    /// size of every batch it receives.
    struct ScriptedImporter {
        calls: Mutex<Vec<usize>>,
        script: Mutex<VecDeque<Result<BatchResponse, ImportApiError>>>,
    }

    impl ScriptedImporter {
        fn new(script: Vec<Result<BatchResponse, ImportApiError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                script: Mutex::new(script.into()),
            })
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordImporter for ScriptedImporter {
        async fn import_batch(
            &self,
            rows: &[ProjectedRow],
        ) -> Result<BatchResponse, ImportApiError> {
            self.calls.lock().unwrap().push(rows.len());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("importer called more often than scripted")
        }
    }

    struct CountingAudit {
        calls: AtomicU32,
        last_total: AtomicU32,
    }

    impl CountingAudit {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                last_total: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl AuditSink for CountingAudit {
        async fn record_import(&self, imported_total: u32) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_total.store(imported_total, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingSink {
        events: Mutex<Vec<(ImportPhase, u8)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        fn events(&self) -> Vec<(ImportPhase, u8)> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn publish(&self, phase: ImportPhase, progress: u8) {
            self.events.lock().unwrap().push((phase, progress));
        }
    }

    fn rows(count: usize) -> Vec<ProjectedRow> {
        vec![ProjectedRow::new(); count]
    }

    fn imported(count: u32) -> BatchResponse {
        BatchResponse {
            imported: count,
            ..BatchResponse::default()
        }
    }

    async fn settle() {
        // let the spawned audit task run
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_seven_thousand_rows_make_three_batches() {
        let second_batch = BatchResponse {
            imported: 2998,
            failed: 2,
            errors: vec![
                RowError {
                    row: 10,
                    email: "a@x.com".to_string(),
                    error: "invalid".to_string(),
                },
                RowError {
                    row: 200,
                    email: "b@x.com".to_string(),
                    error: "invalid".to_string(),
                },
            ],
            ..BatchResponse::default()
        };
        let importer = ScriptedImporter::new(vec![
            Ok(imported(3000)),
            Ok(second_batch),
            Ok(imported(1000)),
        ]);
        let engine = ImportEngine::new(importer.clone(), CountingAudit::new());

        let outcome = engine.run(rows(7000), &RecordingSink::new()).await;

        assert_eq!(importer.batch_sizes(), vec![3000, 3000, 1000]);
        assert_eq!(outcome.phase, ImportPhase::Completed);
        assert_eq!(outcome.imported, 6998);

        let error_rows: Vec<u32> = outcome.errors.iter().map(|e| e.row).collect();
        assert_eq!(error_rows, vec![3010, 3200]);
    }

    #[tokio::test]
    async fn test_conflict_stops_before_next_batch() {
        let importer = ScriptedImporter::new(vec![
            Ok(imported(3000)),
            Err(ImportApiError::Duplicate {
                existing: vec!["dup@x.com".to_string()],
            }),
            Ok(imported(1000)),
        ]);
        let engine = ImportEngine::new(importer.clone(), CountingAudit::new());

        let outcome = engine.run(rows(7000), &RecordingSink::new()).await;

        // batch 3 must never be submitted
        assert_eq!(importer.batch_sizes(), vec![3000, 3000]);
        assert_eq!(outcome.phase, ImportPhase::AbortedOnConflict);
        assert_eq!(outcome.existing_emails, vec!["dup@x.com".to_string()]);
        assert_eq!(outcome.progress, 100);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_ends_at_100() {
        let importer = ScriptedImporter::new(vec![
            Ok(imported(1)),
            Ok(imported(1)),
            Ok(imported(1)),
        ]);
        let engine = ImportEngine::new(importer, CountingAudit::new());
        let sink = RecordingSink::new();

        engine.run(rows(7000), &sink).await;

        let events = sink.events();
        let values: Vec<u8> = events.iter().map(|(_, p)| *p).collect();
        assert_eq!(values, vec![0, 30, 60, 100]);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(events.last().unwrap().0, ImportPhase::Completed);
    }

    #[tokio::test]
    async fn test_generic_batch_failure_continues_the_run() {
        let importer = ScriptedImporter::new(vec![
            Err(ImportApiError::Rejected("rate limited".to_string())),
            Ok(imported(1000)),
        ]);
        let engine = ImportEngine::new(importer.clone(), CountingAudit::new());

        let outcome = engine.run(rows(4000), &RecordingSink::new()).await;

        assert_eq!(importer.batch_sizes(), vec![3000, 1000]);
        assert_eq!(outcome.phase, ImportPhase::Completed);
        assert_eq!(outcome.failed, 3000);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row, 1);
        assert!(outcome.errors[0].error.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_zero_imported_resets_to_idle_without_audit() {
        let importer = ScriptedImporter::new(vec![Ok(BatchResponse::default())]);
        let audit = CountingAudit::new();
        let engine = ImportEngine::new(importer, audit.clone());

        let outcome = engine.run(rows(100), &RecordingSink::new()).await;
        settle().await;

        assert_eq!(outcome.phase, ImportPhase::Idle);
        assert!(outcome.message.is_some());
        assert_eq!(outcome.progress, 100);
        assert_eq!(audit.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_run_records_one_audit_entry() {
        let importer = ScriptedImporter::new(vec![Ok(imported(42))]);
        let audit = CountingAudit::new();
        let engine = ImportEngine::new(importer, audit.clone());

        engine.run(rows(42), &RecordingSink::new()).await;
        settle().await;

        assert_eq!(audit.calls.load(Ordering::SeqCst), 1);
        assert_eq!(audit.last_total.load(Ordering::SeqCst), 42);
    }

    #[tokio::test]
    async fn test_small_file_is_a_single_batch() {
        let importer = ScriptedImporter::new(vec![Ok(imported(5))]);
        let engine = ImportEngine::new(importer.clone(), CountingAudit::new());
        let sink = RecordingSink::new();

        let outcome = engine.run(rows(5), &sink).await;

        assert_eq!(importer.batch_sizes(), vec![5]);
        assert_eq!(outcome.phase, ImportPhase::Completed);
        assert_eq!(sink.events().first().unwrap(), &(ImportPhase::Running, 0));
    }
}
