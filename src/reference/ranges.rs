use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ReferenceError;

/// Accepted interval for one lab test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabRange {
    pub test_name: String,
    pub low: f64,
    pub high: f64,
    /// Composite test this record was split from (e.g. `blood_pressure`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Which side of the interval a value fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeDirection {
    Low,
    High,
}

impl RangeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
        }
    }
}

impl LabRange {
    pub fn new(test_name: &str, low: f64, high: f64) -> Self {
        Self {
            test_name: test_name.to_string(),
            low,
            high,
            group: None,
        }
    }

    /// `None` when `value` lies inside the closed interval.
    pub fn classify(&self, value: f64) -> Option<RangeDirection> {
        if value < self.low {
            Some(RangeDirection::Low)
        } else if value > self.high {
            Some(RangeDirection::High)
        } else {
            None
        }
    }
}

/// A range plus the compiled pattern that finds its value in report text.
#[derive(Debug, Clone)]
pub struct RangeEntry {
    range: LabRange,
    value_pattern: Regex,
}

impl RangeEntry {
    pub fn range(&self) -> &LabRange {
        &self.range
    }

    /// Case-insensitive `<test name>[:\s]*<number>`; group 1 is the number.
    pub fn value_pattern(&self) -> &Regex {
        &self.value_pattern
    }
}

/// Ordered, validated set of lab ranges.
#[derive(Debug, Clone)]
pub struct RangeTable {
    entries: Vec<RangeEntry>,
}

impl RangeTable {
    pub fn new(ranges: Vec<LabRange>) -> Result<Self, ReferenceError> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(ranges.len());

        for range in ranges {
            if range.test_name.trim().is_empty() {
                return Err(ReferenceError::BlankTestName);
            }
            if range.low.is_nan() || range.high.is_nan() || range.low > range.high {
                return Err(ReferenceError::InvalidRange {
                    test_name: range.test_name,
                    low: range.low,
                    high: range.high,
                });
            }
            if !seen.insert(range.test_name.to_lowercase()) {
                return Err(ReferenceError::Duplicate(range.test_name));
            }

            let value_pattern = value_pattern_for(&range.test_name)?;
            entries.push(RangeEntry {
                range,
                value_pattern,
            });
        }

        Ok(Self { entries })
    }

    pub fn from_json(source: &str, json: &str) -> Result<Self, ReferenceError> {
        let ranges: Vec<LabRange> = serde_json::from_str(json)
            .map_err(|e| ReferenceError::Parse(source.to_string(), e.to_string()))?;
        Self::new(ranges)
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabRange> {
        self.entries.iter().map(|e| &e.range)
    }

    pub fn get(&self, test_name: &str) -> Option<&LabRange> {
        self.iter().find(|r| r.test_name == test_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn value_pattern_for(test_name: &str) -> Result<Regex, ReferenceError> {
    // ASCII integer or decimal, first occurrence only.
    let pattern = format!(r"(?i){}[:\s]*([0-9]*\.?[0-9]+)", regex::escape(test_name));
    Regex::new(&pattern).map_err(|e| ReferenceError::Pattern(test_name.to_string(), e.to_string()))
}
