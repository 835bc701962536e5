//! Condition keywords found in report text, and the medicines they map to.
//!
//! Matching is plain case-insensitive substring containment. Negations are
//! not understood: "no evidence of infection" still yields `infection`.

use serde::{Deserialize, Serialize};

use crate::reference::ConditionTable;

/// Medicines suggested for one detected condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub condition: String,
    pub medicines: Vec<String>,
}

/// Keywords present in `text`, in table order.
pub fn detect_conditions<'t>(text: &str, table: &'t ConditionTable) -> Vec<&'t str> {
    let haystack = text.to_lowercase();
    table
        .iter()
        .filter(|entry| haystack.contains(entry.condition.as_str()))
        .map(|entry| entry.condition.as_str())
        .collect()
}

/// Table rows for the given keywords. Unknown keywords are skipped.
pub fn recommendations_for(conditions: &[&str], table: &ConditionTable) -> Vec<Recommendation> {
    conditions
        .iter()
        .filter_map(|condition| {
            table.get(condition).map(|medicines| Recommendation {
                condition: condition.to_string(),
                medicines: medicines.to_vec(),
            })
        })
        .collect()
}

/// Detect conditions and resolve their medicines in one pass.
pub fn recommend(text: &str, table: &ConditionTable) -> Vec<Recommendation> {
    let conditions = detect_conditions(text, table);
    let recommendations = recommendations_for(&conditions, table);
    tracing::debug!(conditions = recommendations.len(), "Conditions detected");
    recommendations
}
