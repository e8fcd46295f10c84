// Language-model provider module
// Polymorphic backends behind a single trait; the variant set is closed
// and selected by the validated configuration, never reflectively.


pub mod ollama;
pub mod remote;

use anyhow::Result;

use crate::config::{Config, ModelParams, Provider};
use crate::memory::ConversationTurn;

pub use ollama::OllamaProvider;
pub use remote::RemoteProvider;

pub const DEFAULT_HEALTH_TIMEOUT_SECONDS: u64 = 5;

/// A language-model backend connector.
pub trait LlmProvider {
    /// Short human-readable backend name for logs and error messages
    fn name(&self) -> &'static str;

    /// Construct a callable model with the given parameters.
    ///
    /// Unlike the probes below, this fails loudly: an unusable model must
    /// not silently proceed.
    fn initialize(&self, params: &ModelParams) -> Result<Box<dyn ChatModel>>;

    /// Lightweight liveness probe with a short timeout.
    ///
    /// Never propagates failures; any error degrades to `false` and is
    /// logged internally.
    fn health_check(&self) -> bool;

    /// Models the backend advertises. Failures normalize to an empty list.
    fn available_models(&self) -> Vec<String>;
}

/// A constructed model that can answer one prompt at a time.
///
/// The call is a single synchronous request/response; conversation history
/// is passed alongside the prompt as auxiliary context.
pub trait ChatModel: Send {
    fn generate(&self, prompt: &str, history: &[ConversationTurn]) -> Result<String>;
}

/// Resolve the configured backend variant.
#[inline]
pub fn provider_for(config: &Config) -> crate::Result<Box<dyn LlmProvider>> {
    match config.provider {
        Provider::Local => Ok(Box::new(OllamaProvider::new(&config.ollama)?)),
        Provider::Remote => Ok(Box::new(RemoteProvider::new(&config.remote)?)),
    }
}

/// Render prior turns into a text block both backends prepend to the
/// prompt. Empty history renders to an empty string.
pub(crate) fn render_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let mut rendered = String::from("Previous conversation:\n");
    for turn in history {
        rendered.push_str("User: ");
        rendered.push_str(&turn.question);
        rendered.push_str("\nAssistant: ");
        rendered.push_str(&turn.answer);
        rendered.push('\n');
    }
    rendered
}
