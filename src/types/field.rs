//! Canonical contact-record fields targeted by the import pipeline

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// One of the fixed attributes a contact record can carry.
///
/// The set is closed; columns that match none of these stay unmapped until
/// the user assigns them by hand or skips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    FirstName,
    LastName,
    JobRole,
    Email,
    Phone,
    CompanyName,
    CompanyPhone,
    Website,
    EmployeeSize,
    Revenue,
    Industry,
    City,
    Country,
    LinkedinUrl,
}

impl CanonicalField {
    /// Every canonical field, in declaration order.
    pub const ALL: [CanonicalField; 14] = [
        CanonicalField::FirstName,
        CanonicalField::LastName,
        CanonicalField::JobRole,
        CanonicalField::Email,
        CanonicalField::Phone,
        CanonicalField::CompanyName,
        CanonicalField::CompanyPhone,
        CanonicalField::Website,
        CanonicalField::EmployeeSize,
        CanonicalField::Revenue,
        CanonicalField::Industry,
        CanonicalField::City,
        CanonicalField::Country,
        CanonicalField::LinkedinUrl,
    ];

    /// Fields that must be mapped and non-blank before an import may start.
    pub const MANDATORY: [CanonicalField; 7] = [
        CanonicalField::FirstName,
        CanonicalField::LastName,
        CanonicalField::JobRole,
        CanonicalField::Email,
        CanonicalField::CompanyName,
        CanonicalField::EmployeeSize,
        CanonicalField::Revenue,
    ];

    /// Wire name, identical to the serde representation.
    pub fn wire_name(self) -> &'static str {
        match self {
            CanonicalField::FirstName => "firstName",
            CanonicalField::LastName => "lastName",
            CanonicalField::JobRole => "jobRole",
            CanonicalField::Email => "email",
            CanonicalField::Phone => "phone",
            CanonicalField::CompanyName => "companyName",
            CanonicalField::CompanyPhone => "companyPhone",
            CanonicalField::Website => "website",
            CanonicalField::EmployeeSize => "employeeSize",
            CanonicalField::Revenue => "revenue",
            CanonicalField::Industry => "industry",
            CanonicalField::City => "city",
            CanonicalField::Country => "country",
            CanonicalField::LinkedinUrl => "linkedinUrl",
        }
    }

    pub fn from_wire(s: &str) -> Option<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .find(|f| f.wire_name() == s)
    }

    pub fn is_mandatory(self) -> bool {
        CanonicalField::MANDATORY.contains(&self)
    }

    /// Whether the field's values pass through the numeric-token cleaner
    /// before submission (currency symbols and whitespace stripped).
    pub fn wants_numeric_cleanup(self) -> bool {
        matches!(
            self,
            CanonicalField::EmployeeSize | CanonicalField::Revenue
        )
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Assignment target of one spreadsheet column.
///
/// A column can point at a canonical field or be explicitly skipped; a header
/// with no entry at all in the mapping is *unmapped*, which is a distinct
/// state from [`ColumnTarget::Skip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnTarget {
    Field(CanonicalField),
    Skip,
}

impl ColumnTarget {
    pub fn field(self) -> Option<CanonicalField> {
        match self {
            ColumnTarget::Field(f) => Some(f),
            ColumnTarget::Skip => None,
        }
    }

    fn as_wire(self) -> &'static str {
        match self {
            ColumnTarget::Field(f) => f.wire_name(),
            ColumnTarget::Skip => "skip",
        }
    }
}

impl Serialize for ColumnTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ColumnTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TargetVisitor;

        impl Visitor<'_> for TargetVisitor {
            type Value = ColumnTarget;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a canonical field name or \"skip\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ColumnTarget, E> {
                if value == "skip" {
                    return Ok(ColumnTarget::Skip);
                }
                CanonicalField::from_wire(value)
                    .map(ColumnTarget::Field)
                    .ok_or_else(|| E::custom(format!("unknown field: {}", value)))
            }
        }

        deserializer.deserialize_str(TargetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_wire_names() {
        for field in CanonicalField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.wire_name()));
        }
    }

    #[test]
    fn test_from_wire_round_trips() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_wire(field.wire_name()), Some(field));
        }
        assert_eq!(CanonicalField::from_wire("nonsense"), None);
    }

    #[test]
    fn test_mandatory_is_subset_of_all() {
        for field in CanonicalField::MANDATORY {
            assert!(CanonicalField::ALL.contains(&field));
            assert!(field.is_mandatory());
        }
        assert!(!CanonicalField::Phone.is_mandatory());
    }

    #[test]
    fn test_column_target_serde() {
        let skip = serde_json::to_string(&ColumnTarget::Skip).unwrap();
        assert_eq!(skip, "\"skip\"");

        let field = serde_json::to_string(&ColumnTarget::Field(CanonicalField::Email)).unwrap();
        assert_eq!(field, "\"email\"");

        let back: ColumnTarget = serde_json::from_str("\"companyName\"").unwrap();
        assert_eq!(back, ColumnTarget::Field(CanonicalField::CompanyName));

        let back: ColumnTarget = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(back, ColumnTarget::Skip);

        assert!(serde_json::from_str::<ColumnTarget>("\"bogus\"").is_err());
    }

    #[test]
    fn test_numeric_cleanup_fields() {
        assert!(CanonicalField::EmployeeSize.wants_numeric_cleanup());
        assert!(CanonicalField::Revenue.wants_numeric_cleanup());
        assert!(!CanonicalField::Email.wants_numeric_cleanup());
    }
}
