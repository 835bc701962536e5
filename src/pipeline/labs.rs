//! Lab values outside their reference interval.
//!
//! Each test name is searched literally (case-insensitive) and only the first
//! `<name>[:\s]*<number>` occurrence counts. A test missing from the text is
//! not abnormal.

use serde::{Deserialize, Serialize};

use crate::reference::{RangeDirection, RangeEntry, RangeTable};

/// A lab value that fell outside its range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AbnormalResult {
    pub test_name: String,
    pub value: f64,
    pub low: f64,
    pub high: f64,
    pub direction: RangeDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// First value reported for the entry's test, if any.
pub fn find_value(entry: &RangeEntry, text: &str) -> Option<f64> {
    let caps = entry.value_pattern().captures(text)?;
    let raw = caps.get(1)?.as_str();
    match raw.parse::<f64>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(test = %entry.range().test_name, raw, error = %e, "Unparsable lab value");
            None
        }
    }
}

/// Out-of-range results, in table order.
pub fn find_abnormal_results(text: &str, table: &RangeTable) -> Vec<AbnormalResult> {
    let results: Vec<AbnormalResult> = table
        .entries()
        .iter()
        .filter_map(|entry| {
            let value = find_value(entry, text)?;
            let range = entry.range();
            range.classify(value).map(|direction| {
                tracing::debug!(test = %range.test_name, direction = direction.as_str(), "Value out of range");
                AbnormalResult {
                    test_name: range.test_name.clone(),
                    value,
                    low: range.low,
                    high: range.high,
                    direction,
                    group: range.group.clone(),
                }
            })
        })
        .collect();

    tracing::debug!(abnormal = results.len(), checked = table.len(), "Lab values analyzed");
    results
}
