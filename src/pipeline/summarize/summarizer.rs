//! Summarizer backed by any [`LlmClient`].
//!
//! Holds an optional configured model. Without one, the best installed model
//! is looked up on first use and reused afterwards.

use std::sync::OnceLock;

use super::ollama::{find_best_model, OllamaClient};
use super::prompt::{build_summary_prompt, SUMMARY_SYSTEM_PROMPT};
use super::types::{LlmClient, Summarizer};
use super::SummarizeError;
use crate::config::AnalyzerConfig;

pub struct LlmSummarizer<C: LlmClient> {
    client: C,
    model: Option<String>,
    resolved: OnceLock<String>,
}

impl<C: LlmClient> LlmSummarizer<C> {
    pub fn new(client: C, model: Option<String>) -> Self {
        Self {
            client,
            model,
            resolved: OnceLock::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Model used for generation, resolving it on first call.
    pub fn model(&self) -> Result<String, SummarizeError> {
        if let Some(model) = self.resolved.get() {
            return Ok(model.clone());
        }

        let model = match &self.model {
            Some(configured) => {
                if !self.client.is_model_available(configured)? {
                    return Err(SummarizeError::ModelNotInstalled(configured.clone()));
                }
                configured.clone()
            }
            None => find_best_model(&self.client)?,
        };

        tracing::info!(model = %model, "Summarization model selected");
        let _ = self.resolved.set(model.clone());
        Ok(model)
    }
}

impl LlmSummarizer<OllamaClient> {
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, SummarizeError> {
        let client = OllamaClient::new(&config.ollama_url, config.request_timeout_secs)?;
        Ok(Self::new(client, config.model.clone()))
    }
}

impl<C: LlmClient> Summarizer for LlmSummarizer<C> {
    fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        if text.trim().is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        let model = self.model()?;
        let prompt = build_summary_prompt(text);
        let start = std::time::Instant::now();
        let summary = self.client.generate(&model, &prompt, SUMMARY_SYSTEM_PROMPT)?;

        tracing::debug!(
            model = %model,
            input_chars = text.chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Summary generated"
        );
        Ok(summary.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::summarize::MockLlmClient;

    #[test]
    fn summary_is_trimmed() {
        let s = LlmSummarizer::new(MockLlmClient::new("  Mild anemia noted.\n"), None);
        assert_eq!(s.summarize("hemoglobin: 10.0").unwrap(), "Mild anemia noted.");
    }

    #[test]
    fn prompt_uses_instruction_template() {
        let s = LlmSummarizer::new(MockLlmClient::new("ok"), None);
        s.summarize("fever and cough").unwrap();
        assert_eq!(
            s.client().prompts(),
            vec!["Summarize the following medical text:\n\nfever and cough".to_string()]
        );
    }

    #[test]
    fn blank_input_skips_model() {
        let s = LlmSummarizer::new(MockLlmClient::new("unused"), None);
        assert!(matches!(s.summarize("  \n\t"), Err(SummarizeError::EmptyInput)));
        assert!(s.client().prompts().is_empty());
    }

    #[test]
    fn unreachable_model_propagates() {
        let s = LlmSummarizer::new(MockLlmClient::unreachable(), None);
        assert!(matches!(
            s.summarize("some text"),
            Err(SummarizeError::OllamaConnection(_))
        ));
    }

    #[test]
    fn configured_model_must_be_installed() {
        let client = MockLlmClient::new("ok").with_models(vec!["llama3.2:3b".into()]);
        let s = LlmSummarizer::new(client, Some("medgemma".into()));
        assert!(matches!(
            s.summarize("text"),
            Err(SummarizeError::ModelNotInstalled(m)) if m == "medgemma"
        ));
    }

    #[test]
    fn configured_model_used_as_is() {
        let client = MockLlmClient::new("ok").with_models(vec!["llama3.2:3b".into()]);
        let s = LlmSummarizer::new(client, Some("llama3.2".into()));
        assert_eq!(s.model().unwrap(), "llama3.2");
    }

    #[test]
    fn model_discovered_when_unset() {
        let client = MockLlmClient::new("ok").with_models(vec!["qwen2.5:7b".into()]);
        let s = LlmSummarizer::new(client, None);
        assert_eq!(s.model().unwrap(), "qwen2.5:7b");
        assert_eq!(s.model().unwrap(), "qwen2.5:7b");
    }

    #[test]
    fn no_installed_model_fails() {
        let client = MockLlmClient::new("ok").with_models(Vec::new());
        let s = LlmSummarizer::new(client, None);
        assert!(matches!(s.summarize("text"), Err(SummarizeError::NoModelAvailable)));
    }
}
