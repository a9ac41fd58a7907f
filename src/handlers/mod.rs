//! NATS message handlers

pub mod import;
pub mod ping;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use tracing::{error, info};

use crate::config::Config;
use crate::services::audit::create_audit_sink;
use crate::services::orchestrator::ImportEngine;
use crate::services::remote::HttpRecordImporter;
use crate::services::session::SessionStore;

/// Start all message handlers
pub async fn start_handlers(client: Client, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    // Shared pipeline collaborators
    let importer = Arc::new(HttpRecordImporter::new(
        &config.import_api_url,
        config.import_api_token.clone(),
    ));
    let audit = create_audit_sink(config.audit_log_url.as_deref());
    let engine = Arc::new(ImportEngine::new(importer, audit));
    let store = Arc::new(SessionStore::new());
    info!("Import engine ready against {}", config.import_api_url);

    // Subscribe to all subjects
    let ping_sub = client.subscribe("prospecta.ping").await?;
    let upload_sub = client.subscribe("prospecta.import.upload").await?;
    let mapping_get_sub = client.subscribe("prospecta.import.mapping.get").await?;
    let mapping_update_sub = client.subscribe("prospecta.import.mapping.update").await?;
    let start_sub = client.subscribe("prospecta.import.start").await?;
    let status_sub = client.subscribe("prospecta.import.status").await?;
    let reset_sub = client.subscribe("prospecta.import.reset").await?;

    info!("Subscribed to NATS subjects");

    // Clone for each handler
    let client_ping = client.clone();
    let client_upload = client.clone();
    let client_mapping_get = client.clone();
    let client_mapping_update = client.clone();
    let client_start = client.clone();
    let client_status = client.clone();
    let client_reset = client.clone();

    let store_upload = Arc::clone(&store);
    let store_mapping_get = Arc::clone(&store);
    let store_mapping_update = Arc::clone(&store);
    let store_start = Arc::clone(&store);
    let store_status = Arc::clone(&store);
    let store_reset = Arc::clone(&store);

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub).await
    });

    let upload_handle = tokio::spawn(async move {
        import::handle_upload(client_upload, upload_sub, store_upload).await
    });

    let mapping_get_handle = tokio::spawn(async move {
        import::handle_mapping_get(client_mapping_get, mapping_get_sub, store_mapping_get).await
    });

    let mapping_update_handle = tokio::spawn(async move {
        import::handle_mapping_update(client_mapping_update, mapping_update_sub, store_mapping_update).await
    });

    let start_handle = tokio::spawn(async move {
        import::handle_start(client_start, start_sub, store_start, engine).await
    });

    let status_handle = tokio::spawn(async move {
        import::handle_status(client_status, status_sub, store_status).await
    });

    let reset_handle = tokio::spawn(async move {
        import::handle_reset(client_reset, reset_sub, store_reset).await
    });

    info!("All handlers started");

    // Wait for all handlers (they run until the connection closes)
    let results = futures::future::join_all(vec![
        ping_handle,
        upload_handle,
        mapping_get_handle,
        mapping_update_handle,
        start_handle,
        status_handle,
        reset_handle,
    ])
    .await;

    for result in results {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Handler exited with error: {}", e),
            Err(e) => error!("Handler task panicked: {}", e),
        }
    }

    Ok(())
}
