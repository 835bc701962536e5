use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Medreport";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the rendered findings report.
pub const REPORT_FILE_NAME: &str = "final_report.pdf";

/// Characters of report text handed to the summarizer.
pub const DEFAULT_SUMMARY_INPUT_CHARS: usize = 4000;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medreport=info,medreport_lib=info"
}

/// Log filter for `--verbose`.
pub fn verbose_log_filter() -> &'static str {
    "medreport=debug,medreport_lib=debug"
}

/// Get the application data directory (~/.medreport/)
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".medreport"))
}

/// Default location of the config file, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("config.json"))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {0}: {1}")]
    Read(String, String),

    #[error("Cannot parse config file {0}: {1}")]
    Parse(String, String),

    #[error("Invalid bind address '{0}'")]
    BindAddr(String),
}

/// Runtime settings for the analyzer and its shells.
///
/// Every field has a default, so a partial JSON file is enough.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Base URL of the Ollama instance used for summaries.
    pub ollama_url: String,
    /// Model to summarize with. `None` picks the best installed model.
    pub model: Option<String>,
    pub request_timeout_secs: u64,
    /// Prefix length (in characters) of the report sent to the summarizer.
    pub summary_input_chars: usize,
    pub output_file_name: String,
    /// Directory holding `lab_ranges.json` and `condition_medicines.json`.
    /// `None` uses the bundled tables.
    pub reference_dir: Option<PathBuf>,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model: None,
            request_timeout_secs: 300, // 5 minutes
            summary_input_chars: DEFAULT_SUMMARY_INPUT_CHARS,
            output_file_name: REPORT_FILE_NAME.to_string(),
            reference_dir: None,
            bind_addr: "127.0.0.1:8501".to_string(),
            max_upload_bytes: 50 * 1024 * 1024, // 50 MB
        }
    }
}

impl AnalyzerConfig {
    /// Load config from a JSON file, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|_| ConfigError::BindAddr(self.bind_addr.clone()))
    }
}
