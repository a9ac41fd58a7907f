//! Per-tenant import sessions
//!
//! A session holds the parsed sheet, the draft column mapping, and the
//! current phase/progress/outcome of at most one import run. The store is
//! the single synchronization point of the pipeline: the mapping is mutable
//! until the run starts, frozen afterwards, and only one run may be in
//! flight per tenant at a time.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{
    ColumnMapping, ImportOutcome, ImportPhase, MappingAssignment, MappingSuggestion, Sheet,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no uploaded sheet for this tenant")]
    NoSession,

    #[error("an import is already running")]
    ImportRunning,
}

#[derive(Debug, Clone)]
struct ImportSession {
    sheet: Sheet,
    mapping: ColumnMapping,
    suggestions: Vec<MappingSuggestion>,
    phase: ImportPhase,
    progress: u8,
    outcome: Option<ImportOutcome>,
}

/// Tenant-keyed session storage. The running import is the only writer of
/// phase and progress; locks are never held across await points.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, ImportSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly uploaded sheet with its proposed mapping, replacing
    /// any previous (non-running) session of the tenant.
    pub fn begin_upload(
        &self,
        tenant: Uuid,
        sheet: Sheet,
        mapping: ColumnMapping,
        suggestions: Vec<MappingSuggestion>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write();
        if let Some(existing) = sessions.get(&tenant) {
            if existing.phase == ImportPhase::Running {
                return Err(SessionError::ImportRunning);
            }
        }
        sessions.insert(
            tenant,
            ImportSession {
                sheet,
                mapping,
                suggestions,
                phase: ImportPhase::Idle,
                progress: 0,
                outcome: None,
            },
        );
        Ok(())
    }

    pub fn mapping_snapshot(
        &self,
        tenant: Uuid,
    ) -> Result<(ColumnMapping, Vec<MappingSuggestion>), SessionError> {
        let sessions = self.sessions.read();
        let session = sessions.get(&tenant).ok_or(SessionError::NoSession)?;
        Ok((session.mapping.clone(), session.suggestions.clone()))
    }

    /// Apply user edits to the draft mapping. Rejected while a run is in
    /// flight; the mapping is frozen once the import starts.
    pub fn apply_assignments(
        &self,
        tenant: Uuid,
        assignments: &[MappingAssignment],
    ) -> Result<ColumnMapping, SessionError> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&tenant).ok_or(SessionError::NoSession)?;
        if session.phase == ImportPhase::Running {
            return Err(SessionError::ImportRunning);
        }

        for assignment in assignments {
            match assignment.target {
                Some(target) => session.mapping.assign(&assignment.header, target),
                None => session.mapping.clear(&assignment.header),
            }
        }
        Ok(session.mapping.clone())
    }

    /// Atomically flip the session into the running phase and hand back the
    /// frozen inputs of the run. A second caller gets `ImportRunning`.
    pub fn begin_run(&self, tenant: Uuid) -> Result<(Sheet, ColumnMapping), SessionError> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&tenant).ok_or(SessionError::NoSession)?;
        if session.phase == ImportPhase::Running {
            return Err(SessionError::ImportRunning);
        }

        session.phase = ImportPhase::Running;
        session.progress = 0;
        session.outcome = None;
        Ok((session.sheet.clone(), session.mapping.clone()))
    }

    /// Roll back a start whose pre-flight validation failed before any batch
    /// was submitted. The session and its mapping stay editable.
    pub fn abort_start(&self, tenant: Uuid) {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get_mut(&tenant) {
            if session.phase == ImportPhase::Running {
                session.phase = ImportPhase::Idle;
            }
        }
    }

    pub fn set_progress(&self, tenant: Uuid, phase: ImportPhase, progress: u8) {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get_mut(&tenant) {
            session.phase = phase;
            session.progress = session.progress.max(progress);
        }
    }

    /// Record the final outcome of a run.
    pub fn finish(&self, tenant: Uuid, outcome: ImportOutcome) {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get_mut(&tenant) {
            session.phase = outcome.phase;
            session.progress = outcome.progress;
            session.outcome = Some(outcome);
        }
    }

    pub fn status(&self, tenant: Uuid) -> (ImportPhase, u8, Option<ImportOutcome>) {
        let sessions = self.sessions.read();
        match sessions.get(&tenant) {
            Some(session) => (session.phase, session.progress, session.outcome.clone()),
            None => (ImportPhase::Idle, 0, None),
        }
    }

    /// Discard all session state of the tenant, returning the pipeline to
    /// idle for a fresh upload. A running import cannot be reset.
    pub fn reset(&self, tenant: Uuid) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get(&tenant) {
            if session.phase == ImportPhase::Running {
                return Err(SessionError::ImportRunning);
            }
        }
        sessions.remove(&tenant);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CanonicalField, ColumnTarget, ImportRow};

    fn sheet() -> Sheet {
        Sheet::new(
            vec!["E-mail".to_string()],
            vec![ImportRow::new(vec!["a@x.com".to_string()])],
        )
    }

    fn store_with_session(tenant: Uuid) -> SessionStore {
        let store = SessionStore::new();
        store
            .begin_upload(tenant, sheet(), ColumnMapping::new(), vec![])
            .unwrap();
        store
    }

    #[test]
    fn test_only_one_run_at_a_time() {
        let tenant = Uuid::new_v4();
        let store = store_with_session(tenant);

        assert!(store.begin_run(tenant).is_ok());
        assert_eq!(store.begin_run(tenant), Err(SessionError::ImportRunning));
    }

    #[test]
    fn test_mapping_is_frozen_while_running() {
        let tenant = Uuid::new_v4();
        let store = store_with_session(tenant);
        store.begin_run(tenant).unwrap();

        let edit = vec![MappingAssignment {
            header: "E-mail".to_string(),
            target: Some(ColumnTarget::Field(CanonicalField::Email)),
        }];
        assert_eq!(
            store.apply_assignments(tenant, &edit),
            Err(SessionError::ImportRunning)
        );
    }

    #[test]
    fn test_upload_rejected_while_running() {
        let tenant = Uuid::new_v4();
        let store = store_with_session(tenant);
        store.begin_run(tenant).unwrap();

        assert_eq!(
            store.begin_upload(tenant, sheet(), ColumnMapping::new(), vec![]),
            Err(SessionError::ImportRunning)
        );
    }

    #[test]
    fn test_finish_reopens_the_session() {
        let tenant = Uuid::new_v4();
        let store = store_with_session(tenant);
        store.begin_run(tenant).unwrap();

        let mut outcome = ImportOutcome::running();
        outcome.set_progress(100);
        outcome.mark_completed();
        store.finish(tenant, outcome);

        let (phase, progress, stored) = store.status(tenant);
        assert_eq!(phase, ImportPhase::Completed);
        assert_eq!(progress, 100);
        assert!(stored.is_some());

        // a new run may start again
        assert!(store.begin_run(tenant).is_ok());
    }

    #[test]
    fn test_reset_discards_state() {
        let tenant = Uuid::new_v4();
        let store = store_with_session(tenant);

        store.reset(tenant).unwrap();
        assert_eq!(
            store.mapping_snapshot(tenant),
            Err(SessionError::NoSession)
        );
        assert_eq!(store.status(tenant), (ImportPhase::Idle, 0, None));
    }

    #[test]
    fn test_reset_rejected_while_running() {
        let tenant = Uuid::new_v4();
        let store = store_with_session(tenant);
        store.begin_run(tenant).unwrap();

        assert_eq!(store.reset(tenant), Err(SessionError::ImportRunning));
    }

    #[test]
    fn test_edits_apply_and_clear() {
        let tenant = Uuid::new_v4();
        let store = store_with_session(tenant);

        let mapping = store
            .apply_assignments(
                tenant,
                &[MappingAssignment {
                    header: "E-mail".to_string(),
                    target: Some(ColumnTarget::Field(CanonicalField::Email)),
                }],
            )
            .unwrap();
        assert_eq!(
            mapping.target_for("E-mail"),
            Some(ColumnTarget::Field(CanonicalField::Email))
        );

        let mapping = store
            .apply_assignments(
                tenant,
                &[MappingAssignment {
                    header: "E-mail".to_string(),
                    target: None,
                }],
            )
            .unwrap();
        assert_eq!(mapping.target_for("E-mail"), None);
    }
}
