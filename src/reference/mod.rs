//! Reference data: lab-test normal ranges and the condition-to-medicine table.
//!
//! Both tables are plain JSON. Copies ship inside the binary; a directory
//! holding `lab_ranges.json` and `condition_medicines.json` can replace them.
//! Tables are validated once at load and immutable afterwards.

pub mod medicines;
pub mod ranges;

pub use medicines::*;
pub use ranges::*;

use std::path::Path;

use thiserror::Error;

use crate::config::AnalyzerConfig;

pub const LAB_RANGES_FILE: &str = "lab_ranges.json";
pub const CONDITION_MEDICINES_FILE: &str = "condition_medicines.json";

const BUILTIN_LAB_RANGES: &str = include_str!("../../resources/lab_ranges.json");
const BUILTIN_CONDITION_MEDICINES: &str =
    include_str!("../../resources/condition_medicines.json");

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Cannot read reference file {0}: {1}")]
    Load(String, String),

    #[error("Cannot parse reference file {0}: {1}")]
    Parse(String, String),

    #[error("Invalid range for '{test_name}': low {low} is above high {high}")]
    InvalidRange { test_name: String, low: f64, high: f64 },

    #[error("Blank test name in range table")]
    BlankTestName,

    #[error("Condition '{0}' has no medicines")]
    EmptyMedicines(String),

    #[error("Condition keyword '{0}' must be non-blank lower case")]
    InvalidCondition(String),

    #[error("Duplicate entry '{0}'")]
    Duplicate(String),

    #[error("Cannot compile value pattern for '{0}': {1}")]
    Pattern(String, String),
}

/// Both lookup tables, loaded together.
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    pub ranges: RangeTable,
    pub medicines: ConditionTable,
}

impl ReferenceTables {
    /// Tables bundled with the binary.
    pub fn builtin() -> Result<Self, ReferenceError> {
        Ok(Self {
            ranges: RangeTable::from_json(LAB_RANGES_FILE, BUILTIN_LAB_RANGES)?,
            medicines: ConditionTable::from_json(
                CONDITION_MEDICINES_FILE,
                BUILTIN_CONDITION_MEDICINES,
            )?,
        })
    }

    /// Load both tables from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ReferenceError> {
        let ranges_path = dir.join(LAB_RANGES_FILE);
        let medicines_path = dir.join(CONDITION_MEDICINES_FILE);

        let ranges_json = std::fs::read_to_string(&ranges_path).map_err(|e| {
            ReferenceError::Load(ranges_path.display().to_string(), e.to_string())
        })?;
        let medicines_json = std::fs::read_to_string(&medicines_path).map_err(|e| {
            ReferenceError::Load(medicines_path.display().to_string(), e.to_string())
        })?;

        Ok(Self {
            ranges: RangeTable::from_json(LAB_RANGES_FILE, &ranges_json)?,
            medicines: ConditionTable::from_json(CONDITION_MEDICINES_FILE, &medicines_json)?,
        })
    }

    /// Tables named by the config: its reference directory, else the bundled copies.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, ReferenceError> {
        let tables = match &config.reference_dir {
            Some(dir) => Self::load(dir)?,
            None => Self::builtin()?,
        };

        tracing::debug!(
            lab_ranges = tables.ranges.len(),
            conditions = tables.medicines.len(),
            custom = config.reference_dir.is_some(),
            "Reference tables loaded"
        );

        Ok(tables)
    }
}
