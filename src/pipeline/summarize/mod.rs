pub mod types;
pub mod prompt;
pub mod ollama;
pub mod summarizer;

pub use types::*;
pub use prompt::*;
pub use ollama::*;
pub use summarizer::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("No summarization model available")]
    NoModelAvailable,

    #[error("Model '{0}' is not installed")]
    ModelNotInstalled(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("No text to summarize")]
    EmptyInput,
}
