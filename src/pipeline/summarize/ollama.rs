use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::LlmClient;
use super::SummarizeError;

/// Models tried, in order, when none is configured.
pub const PREFERRED_MODELS: &[&str] = &[
    "medgemma",
    "llama3.2",
    "llama3.1",
    "mistral",
    "qwen2.5",
];

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, SummarizeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SummarizeError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send_error(&self, e: reqwest::Error) -> SummarizeError {
        if e.is_connect() {
            SummarizeError::OllamaConnection(self.base_url.clone())
        } else if e.is_timeout() {
            SummarizeError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            SummarizeError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl LlmClient for OllamaClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<String, SummarizeError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SummarizeError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| SummarizeError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, SummarizeError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, SummarizeError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SummarizeError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| SummarizeError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

/// First entry of [`PREFERRED_MODELS`] the client has installed.
pub fn find_best_model(client: &dyn LlmClient) -> Result<String, SummarizeError> {
    let available = client.list_models()?;
    for preferred in PREFERRED_MODELS {
        if let Some(found) = available.iter().find(|m| m.starts_with(preferred)) {
            return Ok(found.clone());
        }
    }
    Err(SummarizeError::NoModelAvailable)
}

/// Mock LLM client for testing. Returns a fixed response and records prompts.
pub struct MockLlmClient {
    response: Result<String, String>,
    available_models: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            available_models: vec!["medgemma:latest".to_string()],
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A client whose server is never reachable.
    pub fn unreachable() -> Self {
        Self {
            response: Err("http://localhost:11434".to_string()),
            available_models: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    /// Prompts received by `generate`, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<(), SummarizeError> {
        match &self.response {
            Ok(_) => Ok(()),
            Err(url) => Err(SummarizeError::OllamaConnection(url.clone())),
        }
    }
}

impl LlmClient for MockLlmClient {
    fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _system: &str,
    ) -> Result<String, SummarizeError> {
        self.check_reachable()?;
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(url) => Err(SummarizeError::OllamaConnection(url.clone())),
        }
    }

    fn is_model_available(&self, model: &str) -> Result<bool, SummarizeError> {
        self.check_reachable()?;
        Ok(self.available_models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, SummarizeError> {
        self.check_reachable()?;
        Ok(self.available_models.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockLlmClient::new("test response");
        let result = client.generate("model", "prompt", "system").unwrap();
        assert_eq!(result, "test response");
        assert_eq!(client.prompts(), vec!["prompt".to_string()]);
    }

    #[test]
    fn mock_client_lists_models() {
        let client = MockLlmClient::new("").with_models(vec![
            "medgemma:latest".into(),
            "llama3:8b".into(),
        ]);
        let models = client.list_models().unwrap();
        assert_eq!(models.len(), 2);
        assert!(client.is_model_available("medgemma").unwrap());
    }

    #[test]
    fn mock_client_model_not_available() {
        let client = MockLlmClient::new("").with_models(vec!["llama3:8b".into()]);
        assert!(!client.is_model_available("medgemma").unwrap());
    }

    #[test]
    fn unreachable_mock_fails_every_call() {
        let client = MockLlmClient::unreachable();
        assert!(matches!(
            client.generate("m", "p", "s"),
            Err(SummarizeError::OllamaConnection(_))
        ));
        assert!(client.list_models().is_err());
        assert!(client.prompts().is_empty());
    }

    #[test]
    fn best_model_follows_preference_order() {
        let client = MockLlmClient::new("").with_models(vec![
            "mistral:7b".into(),
            "llama3.2:3b".into(),
        ]);
        assert_eq!(find_best_model(&client).unwrap(), "llama3.2:3b");
    }

    #[test]
    fn best_model_none_installed() {
        let client = MockLlmClient::new("").with_models(vec!["phi3:mini".into()]);
        assert!(matches!(
            find_best_model(&client),
            Err(SummarizeError::NoModelAvailable)
        ));
    }

    #[test]
    fn ollama_client_constructor() {
        let client = OllamaClient::new("http://localhost:11434", 120).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.timeout_secs, 120);
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", 60).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }
}
