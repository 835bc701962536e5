use super::SummarizeError;

/// Text generation backend. Blocking.
pub trait LlmClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<String, SummarizeError>;

    fn is_model_available(&self, model: &str) -> Result<bool, SummarizeError>;

    fn list_models(&self) -> Result<Vec<String>, SummarizeError>;
}

/// Turns a text segment into a short summary.
///
/// The caller decides how much text to pass; implementations send what
/// they receive.
pub trait Summarizer {
    fn summarize(&self, text: &str) -> Result<String, SummarizeError>;
}
