//! Wire types for the spreadsheet import subjects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field::CanonicalField;
use super::mapping::{ColumnMapping, MappingAssignment, MappingSuggestion};
use super::outcome::{ImportPhase, RowError};

/// Request to upload a spreadsheet for import. The file content travels
/// base64-encoded; row 0 of the decoded grid is treated as headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSheetRequest {
    pub file_name: String,
    pub content_base64: String,
}

/// Reply to an upload: the parsed headers plus the proposed column mapping.
///
/// Only confident mandatory-field matches are pre-assigned; matches on
/// optional fields come back as suggestions the user must confirm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSheetResponse {
    pub headers: Vec<String>,
    pub row_count: usize,
    pub mapping: ColumnMapping,
    pub suggestions: Vec<MappingSuggestion>,
    /// Headers the matcher could not place at all.
    pub unmapped: Vec<String>,
}

/// User edits to the draft mapping, applied atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingUpdateRequest {
    pub assignments: Vec<MappingAssignment>,
}

/// Current draft mapping plus what still blocks the import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSnapshot {
    pub mapping: ColumnMapping,
    pub suggestions: Vec<MappingSuggestion>,
    pub missing_mandatory: Vec<CanonicalField>,
}

/// Reply when the chunked phase has been accepted and started.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartImportResponse {
    pub total_rows: usize,
    pub total_batches: usize,
}

/// Aggregated presentation of a finished (or aborted) import, with long
/// identifier and error lists cut down to a short preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub phase: ImportPhase,
    pub imported: u32,
    pub companies_created: u32,
    pub companies_updated: u32,
    pub failed: u32,
    /// Rows skipped because the server already holds them.
    pub skipped: u32,
    pub duplicate_preview: Vec<String>,
    pub duplicate_more: usize,
    pub imported_preview: Vec<String>,
    pub imported_more: usize,
    pub error_preview: Vec<RowError>,
    pub error_more: usize,
    pub message: String,
}

/// Reply to a status poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatusResponse {
    pub phase: ImportPhase,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ImportSummary>,
}

/// Live progress message published to the tenant's progress subject before
/// every batch submission and once more at the end of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgressUpdate {
    pub tenant_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub phase: ImportPhase,
    pub progress: u8,
}

impl ImportProgressUpdate {
    pub fn new(tenant_id: Uuid, phase: ImportPhase, progress: u8) -> Self {
        Self {
            tenant_id,
            timestamp: Utc::now(),
            phase,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_update_serializes_camel_case() {
        let update = ImportProgressUpdate::new(Uuid::nil(), ImportPhase::Running, 45);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["tenantId"], Uuid::nil().to_string());
        assert_eq!(json["phase"], "running");
        assert_eq!(json["progress"], 45);
    }

    #[test]
    fn test_status_response_omits_absent_summary() {
        let response = ImportStatusResponse {
            phase: ImportPhase::Idle,
            progress: 0,
            summary: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("summary"));
    }
}
