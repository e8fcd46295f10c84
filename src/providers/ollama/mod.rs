
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{ChatModel, DEFAULT_HEALTH_TIMEOUT_SECONDS, LlmProvider, render_history};
use crate::config::{ConfigError, ModelParams, OllamaConfig};
use crate::memory::ConversationTurn;

const GENERATE_TIMEOUT_SECONDS: u64 = 120;
const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Connector for a locally reachable Ollama inference service.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: Url,
    model: String,
    probe: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: u32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelTag>,
}

impl OllamaProvider {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: config.base_url()?,
            model: config.model.clone(),
            probe: probe_agent(Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECONDS)),
        })
    }

    /// Override the probe timeout used by health and model-listing calls.
    #[inline]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.probe = probe_agent(timeout);
        self
    }

    fn tags_url(&self) -> Result<Url> {
        self.base_url
            .join("/api/tags")
            .context("Failed to build tags URL")
    }
}

impl LlmProvider for OllamaProvider {
    #[inline]
    fn name(&self) -> &'static str {
        "ollama"
    }

    #[inline]
    fn initialize(&self, params: &ModelParams) -> Result<Box<dyn ChatModel>> {
        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generate URL")?;

        debug!(
            "Constructing Ollama model {} at {} (temperature={}, num_ctx={}, top_k={})",
            self.model, url, params.temperature, params.context_length, params.top_k
        );

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(GENERATE_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Box::new(OllamaModel {
            url,
            model: self.model.clone(),
            options: GenerateOptions {
                temperature: params.temperature,
                num_ctx: params.context_length,
                top_k: params.top_k,
            },
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }))
    }

    #[inline]
    fn health_check(&self) -> bool {
        let url = match self.tags_url() {
            Ok(url) => url,
            Err(e) => {
                warn!("Health check skipped, bad URL: {}", e);
                return false;
            }
        };

        debug!("Pinging Ollama at {}", url);
        match self.probe.get(url.as_str()).call() {
            Ok(_) => true,
            Err(e) => {
                warn!("Ollama health check failed: {}", e);
                false
            }
        }
    }

    #[inline]
    fn available_models(&self) -> Vec<String> {
        let url = match self.tags_url() {
            Ok(url) => url,
            Err(e) => {
                warn!("Model listing skipped, bad URL: {}", e);
                return Vec::new();
            }
        };

        let response = self
            .probe
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string());

        match response {
            Ok(body) => match serde_json::from_str::<ModelsResponse>(&body) {
                Ok(parsed) => parsed.models.into_iter().map(|m| m.name).collect(),
                Err(e) => {
                    warn!("Failed to parse Ollama model list: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Failed to list Ollama models: {}", e);
                Vec::new()
            }
        }
    }
}

struct OllamaModel {
    url: Url,
    model: String,
    options: GenerateOptions,
    agent: ureq::Agent,
    retry_attempts: u32,
}

impl ChatModel for OllamaModel {
    fn generate(&self, prompt: &str, history: &[ConversationTurn]) -> Result<String> {
        let rendered_history = render_history(history);
        let full_prompt = if rendered_history.is_empty() {
            prompt.to_string()
        } else {
            format!("{rendered_history}\n{prompt}")
        };

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: full_prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.options.temperature,
                num_ctx: self.options.num_ctx,
                top_k: self.options.top_k,
            },
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generate request")?;

        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(self.url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to generate completion")?;

        let parsed: GenerateResponse = serde_json::from_str(&response_text)
            .context("Failed to parse generate response")?;

        debug!(
            "Ollama returned {} characters for model {}",
            parsed.response.len(),
            self.model
        );
        Ok(parsed.response)
    }
}

fn probe_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Retry transport and server errors with exponential backoff; client
/// errors fail immediately.
pub(super) fn request_with_retry<F>(attempts: u32, mut request_fn: F) -> Result<String>
where
    F: FnMut() -> Result<String, ureq::Error>,
{
    let mut last_error = None;

    for attempt in 1..=attempts {
        match request_fn() {
            Ok(response_text) => return Ok(response_text),
            Err(error) => {
                let should_retry = match &error {
                    ureq::Error::StatusCode(status) => {
                        if *status >= 500 {
                            warn!("Server error (status {}), attempt {}/{}", status, attempt, attempts);
                            true
                        } else {
                            return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                        }
                    }
                    ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_) => {
                        warn!("Transport error: {}, attempt {}/{}", error, attempt, attempts);
                        true
                    }
                    _ => false,
                };

                if !should_retry {
                    return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                }

                last_error = Some(anyhow::anyhow!("Request error: {}", error));

                if attempt < attempts {
                    let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                    std::thread::sleep(Duration::from_millis(delay_ms));
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
}
