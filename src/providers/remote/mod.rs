#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::ollama::request_with_retry;
use super::{ChatModel, DEFAULT_HEALTH_TIMEOUT_SECONDS, LlmProvider, render_history};
use crate::config::{ConfigError, ModelParams, RemoteConfig};
use crate::memory::ConversationTurn;

const COMPLETION_TIMEOUT_SECONDS: u64 = 120;
const DEFAULT_RETRY_ATTEMPTS: u32 = 2;

/// Connector for a managed cloud inference gateway.
///
/// Speaks the OpenAI-compatible surface exposed by hosted gateways
/// (list models, completions) over plain HTTPS with a bearer credential
/// resolved from the environment variable the configuration names.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    endpoint: Url,
    model_id: String,
    api_key_env: String,
    api_key: Option<String>,
    probe: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    prompt: String,
    temperature: f32,
    max_tokens: u32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    data: Vec<ModelEntry>,
}

impl RemoteProvider {
    #[inline]
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        if api_key.is_none() {
            debug!(
                "Credential variable {} not set; remote backend will fail initialization",
                config.api_key_env
            );
        }

        Ok(Self {
            endpoint: config.effective_endpoint()?,
            model_id: config.model_id.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key,
            probe: probe_agent(Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECONDS)),
        })
    }

    /// Override the probe timeout used by health and model-listing calls.
    #[inline]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.probe = probe_agent(timeout);
        self
    }

    fn models_url(&self) -> Result<Url> {
        self.endpoint
            .join("/v1/models")
            .context("Failed to build models URL")
    }

    fn list_models(&self) -> Result<Vec<String>> {
        let url = self.models_url()?;
        let mut request = self.probe.get(url.as_str());
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let body = request
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Model listing request failed")?;

        let parsed: ModelListResponse =
            serde_json::from_str(&body).context("Failed to parse model list response")?;
        Ok(parsed.data.into_iter().map(|entry| entry.id).collect())
    }
}

impl LlmProvider for RemoteProvider {
    #[inline]
    fn name(&self) -> &'static str {
        "remote"
    }

    #[inline]
    fn initialize(&self, params: &ModelParams) -> Result<Box<dyn ChatModel>> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "credential environment variable {} is not set",
                self.api_key_env
            )
        })?;

        let url = self
            .endpoint
            .join("/v1/completions")
            .context("Failed to build completions URL")?;

        debug!(
            "Constructing remote model {} at {} (temperature={}, max_tokens={})",
            self.model_id, url, params.temperature, params.context_length
        );

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(COMPLETION_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Box::new(RemoteModel {
            url,
            api_key,
            model_id: self.model_id.clone(),
            temperature: params.temperature,
            max_tokens: params.context_length,
            top_k: params.top_k,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }))
    }

    #[inline]
    fn health_check(&self) -> bool {
        // The list-models call doubles as the liveness probe
        match self.list_models() {
            Ok(_) => true,
            Err(e) => {
                warn!("Remote gateway health check failed: {}", e);
                false
            }
        }
    }

    #[inline]
    fn available_models(&self) -> Vec<String> {
        match self.list_models() {
            Ok(models) => models,
            Err(e) => {
                warn!("Failed to list remote models: {}", e);
                Vec::new()
            }
        }
    }
}

struct RemoteModel {
    url: Url,
    api_key: String,
    model_id: String,
    temperature: f32,
    max_tokens: u32,
    top_k: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
}

impl ChatModel for RemoteModel {
    fn generate(&self, prompt: &str, history: &[ConversationTurn]) -> Result<String> {
        let rendered_history = render_history(history);
        let full_prompt = if rendered_history.is_empty() {
            prompt.to_string()
        } else {
            format!("{rendered_history}\n{prompt}")
        };

        let request = CompletionRequest {
            model: self.model_id.clone(),
            prompt: full_prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_k: self.top_k,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize completion request")?;

        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(self.url.as_str())
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to request completion")?;

        let parsed: CompletionResponse = serde_json::from_str(&response_text)
            .context("Failed to parse completion response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| anyhow::anyhow!("completion response held no choices"))
    }
}

fn probe_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}
