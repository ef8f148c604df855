//! Canonical schema of normalized machine-spec fields
//!
//! Every upstream source is mapped into this fixed set of fields. The
//! declaration order of [`CanonicalField`] is the order fields appear in
//! normalized output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One field of the normalized machine-spec record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    /// Operating system name
    Os,
    /// CPU model
    Cpu,
    /// Installed memory in gigabytes
    MemoryGb,
}

impl CanonicalField {
    /// All canonical fields in output order
    pub const ALL: [CanonicalField; 3] = [CanonicalField::Os, CanonicalField::Cpu, CanonicalField::MemoryGb];

    /// Normalized field name as it appears in records and mapping documents
    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Os => "os",
            CanonicalField::Cpu => "cpu",
            CanonicalField::MemoryGb => "memory_gb",
        }
    }

    /// Required fields must be mapped by every source
    pub fn is_required(self) -> bool {
        matches!(self, CanonicalField::Os | CanonicalField::Cpu)
    }

    /// Look up a canonical field by its normalized name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Names of all canonical fields, in output order
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|field| field.name()).collect()
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_name(field.name()), Some(field));
        }
        assert_eq!(CanonicalField::from_name("gpu"), None);
    }

    #[test]
    fn test_required_fields() {
        assert!(CanonicalField::Os.is_required());
        assert!(CanonicalField::Cpu.is_required());
        assert!(!CanonicalField::MemoryGb.is_required());
    }

    #[test]
    fn test_serializes_as_snake_case() {
        let json = serde_json::to_string(&CanonicalField::MemoryGb).unwrap();
        assert_eq!(json, "\"memory_gb\"");
    }
}
