//! Header-to-field matching
//!
//! Turns a user-authored column header into a best-guess canonical field.
//! Matching is an ordered rule pipeline, first success wins:
//!
//! 1. alias dictionary lookup (known spellings and abbreviations)
//! 2. exact canonical-name match
//! 3. substring containment, longest field name first
//!
//! Every comparison runs on normalized strings; the original header is never
//! altered.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::types::CanonicalField;

/// Canonicalize a header or field name for comparison: lowercase, keep only
/// ascii letters and digits.
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Known header spellings keyed by normalized form. Checked before the
/// generic heuristics because several of these would otherwise be mis-ranked
/// by plain containment (e.g. "company" is a substring of companyPhone's
/// normalized name but almost always means the company name column).
static HEADER_ALIASES: Lazy<HashMap<&'static str, CanonicalField>> = Lazy::new(|| {
    use CanonicalField::*;

    let mut aliases = HashMap::new();
    aliases.insert("fname", FirstName);
    aliases.insert("first", FirstName);
    aliases.insert("givenname", FirstName);
    aliases.insert("forename", FirstName);

    aliases.insert("lname", LastName);
    aliases.insert("last", LastName);
    aliases.insert("surname", LastName);
    aliases.insert("familyname", LastName);

    aliases.insert("title", JobRole);
    aliases.insert("jobtitle", JobRole);
    aliases.insert("position", JobRole);
    aliases.insert("designation", JobRole);
    aliases.insert("role", JobRole);

    aliases.insert("mail", Email);
    aliases.insert("emailaddress", Email);
    aliases.insert("emailid", Email);

    aliases.insert("mobile", Phone);
    aliases.insert("cell", Phone);
    aliases.insert("cellphone", Phone);
    aliases.insert("telephone", Phone);
    aliases.insert("directdial", Phone);

    aliases.insert("company", CompanyName);
    aliases.insert("org", CompanyName);
    aliases.insert("organization", CompanyName);
    aliases.insert("organisation", CompanyName);
    aliases.insert("employer", CompanyName);
    aliases.insert("account", CompanyName);
    aliases.insert("business", CompanyName);

    aliases.insert("workphone", CompanyPhone);
    aliases.insert("officephone", CompanyPhone);
    aliases.insert("switchboard", CompanyPhone);

    aliases.insert("url", Website);
    aliases.insert("web", Website);
    aliases.insert("domain", Website);
    aliases.insert("site", Website);

    aliases.insert("employees", EmployeeSize);
    aliases.insert("employeecount", EmployeeSize);
    aliases.insert("headcount", EmployeeSize);
    aliases.insert("companysize", EmployeeSize);
    aliases.insert("size", EmployeeSize);
    aliases.insert("noofemployees", EmployeeSize);
    aliases.insert("numberofemployees", EmployeeSize);
    aliases.insert("staffcount", EmployeeSize);

    aliases.insert("turnover", Revenue);
    aliases.insert("sales", Revenue);
    aliases.insert("annualsales", Revenue);

    aliases.insert("sector", Industry);
    aliases.insert("vertical", Industry);

    aliases.insert("town", City);
    aliases.insert("nation", Country);

    aliases.insert("linkedin", LinkedinUrl);
    aliases.insert("linkedinprofile", LinkedinUrl);

    aliases
});

/// Substring checks below this normalized length are rejected to avoid
/// nonsense matches on very short headers.
const MIN_SUBSTRING_LEN: usize = 3;

/// Best-guess canonical field for a raw header, or `None` when the column
/// should be left for manual assignment. Deterministic for a given input.
pub fn match_header(header: &str, candidates: &[CanonicalField]) -> Option<CanonicalField> {
    let key = normalize(header);
    if key.is_empty() {
        return None;
    }

    if let Some(&field) = HEADER_ALIASES.get(key.as_str()) {
        if candidates.contains(&field) {
            return Some(field);
        }
    }

    if let Some(&field) = candidates
        .iter()
        .find(|f| normalize(f.wire_name()) == key)
    {
        return Some(field);
    }

    // Longer field names first so a specific field is not shadowed by a
    // shorter one whose name is a substring of it.
    let mut by_length: Vec<(CanonicalField, String)> = candidates
        .iter()
        .map(|&f| (f, normalize(f.wire_name())))
        .collect();
    by_length.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    for (field, name) in by_length {
        if name.len() >= MIN_SUBSTRING_LEN && key.contains(&name) {
            return Some(field);
        }
        if key.len() >= MIN_SUBSTRING_LEN && name.contains(&key) {
            return Some(field);
        }
    }

    None
}

/// [`match_header`] against the full canonical field set.
pub fn match_any(header: &str) -> Option<CanonicalField> {
    match_header(header, &CanonicalField::ALL)
}
