//! Patient identity fields pulled from report text.
//!
//! Only the literal `Name` / `Age` prefixes are matched, case-sensitively.
//! Names are ASCII letters only; accented or non-Latin names fall back to
//! the sentinel.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder for a field the text does not contain.
pub const UNKNOWN: &str = "Unknown";

/// `Name`, optional `:`/whitespace, then one or two alphabetic words.
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Name[:\s]*([A-Za-z]+(?: [A-Za-z]+)?)(?:\s|$)").expect("Invalid name pattern")
});

/// `Age`, optional `:`/whitespace, then digits.
static AGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Age[:\s]*([0-9]+)").expect("Invalid age pattern"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientFields {
    pub name: String,
    pub age: String,
}

impl PatientFields {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.into(),
            age: UNKNOWN.into(),
        }
    }

    pub fn has_name(&self) -> bool {
        self.name != UNKNOWN
    }

    pub fn has_age(&self) -> bool {
        self.age != UNKNOWN
    }
}

impl fmt::Display for PatientFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name: {}\nAge: {}", self.name, self.age)
    }
}

pub fn extract_patient_fields(text: &str) -> PatientFields {
    PatientFields {
        name: first_capture(&NAME_PATTERN, text),
        age: first_capture(&AGE_PATTERN, text),
    }
}

fn first_capture(pattern: &Regex, text: &str) -> String {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
