//! Spreadsheet import handlers
//!
//! Request/reply surface of the import pipeline: upload a sheet, inspect and
//! edit the proposed column mapping, start the chunked run, poll status,
//! reset. Live progress is pushed separately to the tenant's progress
//! subject while a run is in flight.

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::StreamExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::defaults::SUMMARY_PREVIEW_LEN;
use crate::services::mapping::{self, MappingError};
use crate::services::orchestrator::{ImportEngine, ProgressSink};
use crate::services::projector;
use crate::services::reporter;
use crate::services::session::{SessionError, SessionStore};
use crate::services::sheet;
use crate::types::{
    ErrorResponse, ImportPhase, ImportProgressUpdate, ImportStatusResponse, MappingSnapshot,
    MappingUpdateRequest, Request, StartImportResponse, SuccessResponse, UploadSheetRequest,
    UploadSheetResponse,
};

/// Subject prefix for per-tenant progress updates.
pub const PROGRESS_SUBJECT_PREFIX: &str = "prospecta.import.progress";

/// Production progress sink: mirrors every update into the session store and
/// publishes it on the tenant's progress subject.
pub struct NatsProgressSink {
    client: Client,
    store: Arc<SessionStore>,
    tenant: Uuid,
}

impl NatsProgressSink {
    pub fn new(client: Client, store: Arc<SessionStore>, tenant: Uuid) -> Self {
        Self {
            client,
            store,
            tenant,
        }
    }
}

#[async_trait]
impl ProgressSink for NatsProgressSink {
    async fn publish(&self, phase: ImportPhase, progress: u8) {
        self.store.set_progress(self.tenant, phase, progress);

        let update = ImportProgressUpdate::new(self.tenant, phase, progress);
        let subject = format!("{}.{}", PROGRESS_SUBJECT_PREFIX, self.tenant);
        match serde_json::to_vec(&update) {
            Ok(payload) => {
                if let Err(e) = self.client.publish(subject, payload.into()).await {
                    debug!("failed to publish progress update: {}", e);
                }
            }
            Err(e) => warn!("failed to encode progress update: {}", e),
        }
    }
}

fn session_error_code(err: &SessionError) -> &'static str {
    match err {
        SessionError::NoSession => "NO_SESSION",
        SessionError::ImportRunning => "IMPORT_RUNNING",
    }
}

fn mapping_error_response(request_id: Uuid, err: &MappingError) -> ErrorResponse {
    match err {
        MappingError::MissingMandatory(missing) => {
            ErrorResponse::new(request_id, "MAPPING_INCOMPLETE", err.to_string())
                .with_details(serde_json::json!({ "missing": missing }))
        }
        MappingError::BlankMandatory { rows, fields } => {
            ErrorResponse::new(request_id, "ROWS_INVALID", err.to_string()).with_details(
                serde_json::json!({
                    "rows": rows.iter().take(SUMMARY_PREVIEW_LEN).collect::<Vec<_>>(),
                    "totalRows": rows.len(),
                    "fields": fields,
                }),
            )
        }
    }
}

// =============================================================================
// UPLOAD HANDLER
// =============================================================================

pub async fn handle_upload(
    client: Client,
    mut subscriber: Subscriber,
    store: Arc<SessionStore>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.upload message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UploadSheetRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let tenant = match request.tenant_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "tenant_id required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let bytes = match BASE64.decode(&request.payload.content_base64) {
            Ok(bytes) => bytes,
            Err(e) => {
                let error = ErrorResponse::new(
                    request.id,
                    "INVALID_FILE",
                    format!("file content is not valid base64: {}", e),
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let parsed = match sheet::decode_sheet(&bytes) {
            Ok(sheet) => sheet,
            Err(e) => {
                let error = ErrorResponse::new(request.id, "INVALID_FILE", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let proposal = mapping::propose_mapping(parsed.headers());
        let headers = parsed.headers().to_vec();
        let row_count = parsed.row_count();

        if let Err(e) = store.begin_upload(
            tenant,
            parsed,
            proposal.mapping.clone(),
            proposal.suggestions.clone(),
        ) {
            let error = ErrorResponse::new(request.id, session_error_code(&e), e.to_string());
            let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            continue;
        }

        debug!(
            "Sheet '{}' uploaded for {}: {} columns, {} rows",
            request.payload.file_name,
            tenant,
            headers.len(),
            row_count
        );

        let response = SuccessResponse::new(
            request.id,
            UploadSheetResponse {
                headers,
                row_count,
                mapping: proposal.mapping,
                suggestions: proposal.suggestions,
                unmapped: proposal.unmapped,
            },
        );
        let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
    }

    Ok(())
}

// =============================================================================
// MAPPING HANDLERS
// =============================================================================

pub async fn handle_mapping_get(
    client: Client,
    mut subscriber: Subscriber,
    store: Arc<SessionStore>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<crate::types::EmptyPayload> =
            match serde_json::from_slice(&msg.payload) {
                Ok(req) => req,
                Err(e) => {
                    let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                    let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                    continue;
                }
            };

        let tenant = match request.tenant_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "tenant_id required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match store.mapping_snapshot(tenant) {
            Ok((mapping, suggestions)) => {
                let missing_mandatory = mapping::missing_mandatory(&mapping);
                let response = SuccessResponse::new(
                    request.id,
                    MappingSnapshot {
                        mapping,
                        suggestions,
                        missing_mandatory,
                    },
                );
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                let error = ErrorResponse::new(request.id, session_error_code(&e), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

pub async fn handle_mapping_update(
    client: Client,
    mut subscriber: Subscriber,
    store: Arc<SessionStore>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.mapping.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<MappingUpdateRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let tenant = match request.tenant_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "tenant_id required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match store.apply_assignments(tenant, &request.payload.assignments) {
            Ok(mapping) => {
                let missing_mandatory = mapping::missing_mandatory(&mapping);
                let (_, suggestions) = store
                    .mapping_snapshot(tenant)
                    .unwrap_or((mapping.clone(), vec![]));
                let response = SuccessResponse::new(
                    request.id,
                    MappingSnapshot {
                        mapping,
                        suggestions,
                        missing_mandatory,
                    },
                );
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                let error = ErrorResponse::new(request.id, session_error_code(&e), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

// =============================================================================
// START HANDLER
// =============================================================================

pub async fn handle_start(
    client: Client,
    mut subscriber: Subscriber,
    store: Arc<SessionStore>,
    engine: Arc<ImportEngine>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.start message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<crate::types::EmptyPayload> =
            match serde_json::from_slice(&msg.payload) {
                Ok(req) => req,
                Err(e) => {
                    let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                    let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                    continue;
                }
            };

        let tenant = match request.tenant_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "tenant_id required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        // Freeze the mapping and claim the single running slot.
        let (frozen_sheet, frozen_mapping) = match store.begin_run(tenant) {
            Ok(inputs) => inputs,
            Err(e) => {
                let error = ErrorResponse::new(request.id, session_error_code(&e), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        // Both checks run synchronously before any network call is made.
        let validation = mapping::validate_mapping(&frozen_mapping)
            .and_then(|_| mapping::validate_rows(&frozen_sheet, &frozen_mapping));
        if let Err(e) = validation {
            store.abort_start(tenant);
            let error = mapping_error_response(request.id, &e);
            let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            continue;
        }

        let rows = projector::project_all(&frozen_sheet, &frozen_mapping);
        let total_rows = rows.len();
        let total_batches = engine.total_batches(total_rows);

        let run_engine = Arc::clone(&engine);
        let run_store = Arc::clone(&store);
        let sink = NatsProgressSink::new(client.clone(), Arc::clone(&store), tenant);
        tokio::spawn(async move {
            let outcome = run_engine.run(rows, &sink).await;
            run_store.finish(tenant, outcome);
        });

        let response = SuccessResponse::new(
            request.id,
            StartImportResponse {
                total_rows,
                total_batches,
            },
        );
        let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
    }

    Ok(())
}

// =============================================================================
// STATUS / RESET HANDLERS
// =============================================================================

pub async fn handle_status(
    client: Client,
    mut subscriber: Subscriber,
    store: Arc<SessionStore>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<crate::types::EmptyPayload> =
            match serde_json::from_slice(&msg.payload) {
                Ok(req) => req,
                Err(e) => {
                    let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                    let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                    continue;
                }
            };

        let tenant = match request.tenant_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "tenant_id required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let (phase, progress, outcome) = store.status(tenant);
        let response = SuccessResponse::new(
            request.id,
            ImportStatusResponse {
                phase,
                progress,
                summary: outcome.as_ref().map(reporter::summarize),
            },
        );
        let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
    }

    Ok(())
}

pub async fn handle_reset(
    client: Client,
    mut subscriber: Subscriber,
    store: Arc<SessionStore>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.reset message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<crate::types::EmptyPayload> =
            match serde_json::from_slice(&msg.payload) {
                Ok(req) => req,
                Err(e) => {
                    let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                    let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                    continue;
                }
            };

        let tenant = match request.tenant_id {
            Some(id) => id,
            None => {
                let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "tenant_id required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match store.reset(tenant) {
            Ok(()) => {
                let response =
                    SuccessResponse::new(request.id, crate::types::EmptyPayload::default());
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                let error = ErrorResponse::new(request.id, session_error_code(&e), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
