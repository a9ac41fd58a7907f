//! Mapping construction and validation
//!
//! The builder runs the header matcher over an uploaded sheet and
//! pre-assigns only the fields the import cannot proceed without; everything
//! else is surfaced as a suggestion so the user confirms it explicitly.
//! Validation happens twice: structurally before the user may leave the
//! mapping step, and per-row immediately before the chunked phase starts.

use thiserror::Error;

use crate::types::{
    CanonicalField, ColumnMapping, ColumnTarget, MappingSuggestion, Sheet,
};

use super::matcher;

/// Initial mapping produced at upload time.
#[derive(Debug, Clone)]
pub struct MappingProposal {
    pub mapping: ColumnMapping,
    pub suggestions: Vec<MappingSuggestion>,
    pub unmapped: Vec<String>,
}

/// Validation failures that block progression to the chunked phase.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("mandatory fields not mapped: {}", join_fields(.0))]
    MissingMandatory(Vec<CanonicalField>),

    #[error(
        "{} rows are missing mandatory values (first: row {})",
        .rows.len(),
        .rows.first().copied().unwrap_or(0)
    )]
    BlankMandatory {
        /// 1-based spreadsheet row numbers (header is row 1).
        rows: Vec<u32>,
        /// The full mandatory field list, for the user-facing report.
        fields: Vec<CanonicalField>,
    },
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.wire_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Run the matcher across all headers and build the initial mapping.
///
/// A header is auto-assigned only when its match is mandatory and that field
/// is not already taken by an earlier column; other matches become
/// suggestions.
pub fn propose_mapping(headers: &[String]) -> MappingProposal {
    let mut mapping = ColumnMapping::new();
    let mut suggestions = Vec::new();
    let mut unmapped = Vec::new();

    for header in headers {
        match matcher::match_any(header) {
            Some(field) if field.is_mandatory() && mapping.header_for(field).is_none() => {
                mapping.assign(header, ColumnTarget::Field(field));
            }
            Some(field) => {
                suggestions.push(MappingSuggestion {
                    header: header.clone(),
                    field,
                });
            }
            None => unmapped.push(header.clone()),
        }
    }

    MappingProposal {
        mapping,
        suggestions,
        unmapped,
    }
}

/// Mandatory fields the mapping does not yet cover, in declaration order.
pub fn missing_mandatory(mapping: &ColumnMapping) -> Vec<CanonicalField> {
    CanonicalField::MANDATORY
        .into_iter()
        .filter(|f| mapping.header_for(*f).is_none())
        .collect()
}

/// Structural check: every mandatory field must be assigned to some column.
pub fn validate_mapping(mapping: &ColumnMapping) -> Result<(), MappingError> {
    let missing = missing_mandatory(mapping);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MappingError::MissingMandatory(missing))
    }
}

/// Content check over the full row set: every mandatory cell must be
/// non-blank after trimming. Any offending row blocks the whole import.
pub fn validate_rows(sheet: &Sheet, mapping: &ColumnMapping) -> Result<(), MappingError> {
    let resolved: Vec<(CanonicalField, &str)> = CanonicalField::MANDATORY
        .into_iter()
        .filter_map(|f| mapping.header_for(f).map(|h| (f, h)))
        .collect();
    if resolved.len() != CanonicalField::MANDATORY.len() {
        return Err(MappingError::MissingMandatory(missing_mandatory(mapping)));
    }

    let mut offending = Vec::new();
    for (idx, row) in sheet.rows().iter().enumerate() {
        let blank = resolved
            .iter()
            .any(|(_, header)| sheet.value(row, header).trim().is_empty());
        if blank {
            // +2: header occupies row 1, data rows are 1-based after it
            offending.push((idx + 2) as u32);
        }
    }

    if offending.is_empty() {
        Ok(())
    } else {
        Err(MappingError::BlankMandatory {
            rows: offending,
            fields: CanonicalField::MANDATORY.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImportRow;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_propose_auto_assigns_mandatory_matches_only() {
        let proposal = propose_mapping(&headers(&["E-mail", "Company", "LinkedIn", "Notes"]));

        assert_eq!(
            proposal.mapping.target_for("E-mail"),
            Some(ColumnTarget::Field(CanonicalField::Email))
        );
        assert_eq!(
            proposal.mapping.target_for("Company"),
            Some(ColumnTarget::Field(CanonicalField::CompanyName))
        );

        // linkedin matches but is optional: suggestion, not assignment
        assert_eq!(proposal.mapping.target_for("LinkedIn"), None);
        assert!(proposal
            .suggestions
            .iter()
            .any(|s| s.header == "LinkedIn" && s.field == CanonicalField::LinkedinUrl));

        assert_eq!(proposal.unmapped, vec!["Notes".to_string()]);
    }

    #[test]
    fn test_propose_does_not_double_assign_a_field() {
        let proposal = propose_mapping(&headers(&["E-mail", "Work Email"]));

        assert_eq!(proposal.mapping.header_for(CanonicalField::Email), Some("E-mail"));
        assert!(proposal
            .suggestions
            .iter()
            .any(|s| s.header == "Work Email" && s.field == CanonicalField::Email));
    }

    #[test]
    fn test_validate_mapping_lists_exactly_the_missing_fields() {
        let mut mapping = ColumnMapping::new();
        for field in [
            CanonicalField::FirstName,
            CanonicalField::LastName,
            CanonicalField::JobRole,
            CanonicalField::EmployeeSize,
            CanonicalField::Revenue,
        ] {
            mapping.assign(field.wire_name(), ColumnTarget::Field(field));
        }

        let err = validate_mapping(&mapping).unwrap_err();
        assert_eq!(
            err,
            MappingError::MissingMandatory(vec![
                CanonicalField::Email,
                CanonicalField::CompanyName,
            ])
        );
    }

    #[test]
    fn test_validate_mapping_accepts_complete_mapping() {
        let mut mapping = ColumnMapping::new();
        for field in CanonicalField::MANDATORY {
            mapping.assign(field.wire_name(), ColumnTarget::Field(field));
        }
        assert!(validate_mapping(&mapping).is_ok());
    }

    fn full_mapping(headers: &[String]) -> ColumnMapping {
        let mut mapping = ColumnMapping::new();
        for (header, field) in headers.iter().zip(CanonicalField::MANDATORY) {
            mapping.assign(header, ColumnTarget::Field(field));
        }
        mapping
    }

    #[test]
    fn test_validate_rows_reports_spreadsheet_row_numbers() {
        let header_names: Vec<String> = CanonicalField::MANDATORY
            .iter()
            .map(|f| f.wire_name().to_string())
            .collect();
        let good = ImportRow::new(vec!["x".to_string(); 7]);
        let mut blank_revenue = vec!["x".to_string(); 7];
        blank_revenue[6] = "   ".to_string();

        let sheet = Sheet::new(
            header_names.clone(),
            vec![
                good.clone(),
                ImportRow::new(blank_revenue),
                good,
                ImportRow::new(vec!["x".to_string(); 6]), // short row: last cell blank
            ],
        );
        let mapping = full_mapping(&header_names);

        let err = validate_rows(&sheet, &mapping).unwrap_err();
        match err {
            MappingError::BlankMandatory { rows, fields } => {
                assert_eq!(rows, vec![3, 5]);
                assert_eq!(fields, CanonicalField::MANDATORY.to_vec());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rows_passes_clean_sheet() {
        let header_names: Vec<String> = CanonicalField::MANDATORY
            .iter()
            .map(|f| f.wire_name().to_string())
            .collect();
        let sheet = Sheet::new(
            header_names.clone(),
            vec![ImportRow::new(vec!["x".to_string(); 7])],
        );
        assert!(validate_rows(&sheet, &full_mapping(&header_names)).is_ok());
    }
}
