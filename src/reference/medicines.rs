use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ReferenceError;

/// Medicines suggested for one condition keyword.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionEntry {
    /// Lower-case phrase matched as a substring of the report.
    pub condition: String,
    pub medicines: Vec<String>,
}

/// Condition keywords in a fixed order, each with a non-empty medicine list.
#[derive(Debug, Clone)]
pub struct ConditionTable {
    entries: Vec<ConditionEntry>,
}

impl ConditionTable {
    pub fn new(entries: Vec<ConditionEntry>) -> Result<Self, ReferenceError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            let keyword = entry.condition.as_str();
            if keyword.trim().is_empty() || keyword != keyword.to_lowercase() {
                return Err(ReferenceError::InvalidCondition(keyword.to_string()));
            }
            if entry.medicines.is_empty() {
                return Err(ReferenceError::EmptyMedicines(keyword.to_string()));
            }
            if !seen.insert(keyword.to_string()) {
                return Err(ReferenceError::Duplicate(keyword.to_string()));
            }
        }

        Ok(Self { entries })
    }

    pub fn from_json(source: &str, json: &str) -> Result<Self, ReferenceError> {
        let entries: Vec<ConditionEntry> = serde_json::from_str(json)
            .map_err(|e| ReferenceError::Parse(source.to_string(), e.to_string()))?;
        Self::new(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConditionEntry> {
        self.entries.iter()
    }

    pub fn get(&self, condition: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.condition == condition)
            .map(|e| e.medicines.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
