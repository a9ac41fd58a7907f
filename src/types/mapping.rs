//! Column-to-field mapping value objects

use serde::{Deserialize, Serialize};

use super::field::{CanonicalField, ColumnTarget};

/// Assignment of raw spreadsheet headers to canonical fields.
///
/// Built once when a sheet is uploaded, editable by the user until the import
/// starts, then passed by value into the chunked phase and never touched
/// again. Each raw header has zero or one entry; a missing entry means the
/// column is unmapped, which is distinct from an explicit skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    entries: Vec<MappingEntry>,
}

/// One header assignment inside a [`ColumnMapping`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub header: String,
    pub target: ColumnTarget,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a header to a target, replacing any previous assignment so the
    /// zero-or-one invariant holds.
    pub fn assign(&mut self, header: &str, target: ColumnTarget) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.header == header) {
            entry.target = target;
        } else {
            self.entries.push(MappingEntry {
                header: header.to_string(),
                target,
            });
        }
    }

    /// Remove a header's assignment entirely, returning it to the unmapped
    /// state.
    pub fn clear(&mut self, header: &str) {
        self.entries.retain(|e| e.header != header);
    }

    pub fn target_for(&self, header: &str) -> Option<ColumnTarget> {
        self.entries
            .iter()
            .find(|e| e.header == header)
            .map(|e| e.target)
    }

    /// The raw header currently assigned to a canonical field, if any.
    pub fn header_for(&self, field: CanonicalField) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.target == ColumnTarget::Field(field))
            .map(|e| e.header.as_str())
    }

    /// Canonical fields assigned to some column, skips excluded.
    pub fn mapped_fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.entries.iter().filter_map(|e| e.target.field())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A matcher hit on a non-mandatory field, surfaced to the user for explicit
/// confirmation instead of being silently auto-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSuggestion {
    pub header: String,
    pub field: CanonicalField,
}

/// One user edit to the draft mapping. A `null` target clears the header back
/// to unmapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingAssignment {
    pub header: String,
    pub target: Option<ColumnTarget>,
}
