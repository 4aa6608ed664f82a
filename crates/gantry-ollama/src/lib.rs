//! Ollama text-generation provider
//!
//! Implements [`TextGenerator`] against a local or remote Ollama server.
//! The server URL and model come from `OLLAMA_HOST` and `OLLAMA_MODEL`,
//! defaulting to a local instance running `codellama:13b-instruct`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gantry_core::{ProviderError, TextGenerator};

/// Ollama connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server base URL
    pub host: String,
    /// Model tag to use for generation
    pub model: String,
    /// Sampling temperature; low for deterministic config output
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            host: std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: std::env::var("OLLAMA_MODEL")
                .unwrap_or_else(|_| "codellama:13b-instruct".to_string()),
            temperature: 0.1,
            top_p: 0.9,
            top_k: 40,
        }
    }
}

impl OllamaConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific server and model
    pub fn new(host: &str, model: &str) -> Self {
        OllamaConfig {
            host: host.trim_end_matches('/').to_string(),
            model: model.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Ollama client implementing the provider seam
pub struct OllamaProvider {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(config: OllamaConfig) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("gantry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(OllamaProvider {
            config,
            http_client,
        })
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(OllamaConfig::from_env())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Verify the server is reachable and the configured model is pulled.
    pub async fn check_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/tags", self.config.host.trim_end_matches('/'));
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(ProviderError::Transport(format!(
                "ollama server returned {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let available = tags.models.iter().any(|m| m.name == self.config.model);
        if !available {
            warn!(
                event = "ollama.model_missing",
                model = %self.config.model,
                "model not found on server; pull it with `ollama pull`",
            );
            return Err(ProviderError::InvalidResponse(format!(
                "model {} is not available on {}",
                self.config.model, self.config.host
            )));
        }
        debug!(event = "ollama.connected", host = %self.config.host, model = %self.config.model);
        Ok(())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(err.to_string())
    }
}

#[async_trait]
impl TextGenerator for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.config.host.trim_end_matches('/'));
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::Transport(format!(
                "ollama generate returned {status}"
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        if body.response.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "empty response from model".to_string(),
            ));
        }
        Ok(body.response)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
