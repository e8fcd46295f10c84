
use std::sync::Arc;
use tracing::{debug, info};

use crate::ChatError;
use crate::config::ModelParams;
use crate::embeddings::HashEmbedder;
use crate::index::VectorIndex;
use crate::memory::{ConversationMemory, ConversationTurn};
use crate::providers::{ChatModel, LlmProvider};

/// Fixed system instruction anchoring every grounded prompt.
pub const SYSTEM_PROMPT: &str = "You are a highly knowledgeable chess engine expert, specifically focusing on PL/SQL-based chess implementations.
Your responses should:
1. Explain chess-specific algorithms and logic clearly
2. Reference relevant procedures and functions with examples
3. Highlight important implementation details and design choices
4. Suggest potential optimizations when appropriate

Always maintain context from the chat history and refer back to previous discussions when relevant.";

// Literal placeholders substituted per question
const GROUNDED_TEMPLATE: &str = "{system}

Context: {context}

Question: {question}

Detailed Answer:";

/// The answer to one question plus the chunks that grounded it.
///
/// Created once per query; not persisted beyond the session.
#[derive(Debug, Clone)]
pub struct AnswerEnvelope {
    pub answer: String,
    /// Source chunks in retrieval order
    pub sources: Vec<SourceChunk>,
}

/// A retrieved chunk annotated for attribution.
#[derive(Debug, Clone)]
pub struct SourceChunk {
    pub package_name: String,
    pub text: String,
    pub formatted_content: String,
    pub score: f32,
}

/// Retrieval-augmented conversation engine.
///
/// `initialize` moves from unconstructed to ready, or fails terminally with
/// a specific cause; each `ask` answers one question and returns the engine
/// to ready, even when generation fails.
pub struct ChatEngine {
    model: Box<dyn ChatModel>,
    index: Arc<VectorIndex>,
    embedder: HashEmbedder,
    memory: ConversationMemory,
    params: ModelParams,
}

impl ChatEngine {
    /// Resolve the backend and construct a ready engine.
    ///
    /// Runs the provider health check before constructing the model, so an
    /// unreachable backend and a failed model construction are reported as
    /// distinct causes.
    #[inline]
    pub fn initialize(
        provider: &dyn LlmProvider,
        params: ModelParams,
        index: Arc<VectorIndex>,
    ) -> crate::Result<Self> {
        params.validate().map_err(ChatError::from)?;

        if !provider.health_check() {
            return Err(ChatError::ProviderUnreachable(format!(
                "the {} backend failed its health probe; check that the service is running and reachable",
                provider.name()
            )));
        }

        let model = provider
            .initialize(&params)
            .map_err(|e| ChatError::ModelConstructionFailed(e.to_string()))?;

        info!(
            "Engine ready: provider={}, index_chunks={}, retrieval_k={}",
            provider.name(),
            index.len(),
            params.retrieval_k
        );

        Ok(Self {
            model,
            index,
            embedder: HashEmbedder::default(),
            memory: ConversationMemory::default(),
            params,
        })
    }

    /// Answer one question grounded in retrieved chunks.
    ///
    /// Retrieval uses the raw question text only; conversation history is
    /// passed to the model as auxiliary context for generation but does not
    /// influence which chunks are retrieved. A generation failure is
    /// recoverable: it leaves memory untouched and the engine ready for the
    /// next question.
    #[inline]
    pub fn ask(&mut self, question: &str) -> crate::Result<AnswerEnvelope> {
        let query = self.embedder.embed(question);
        let hits = self.index.search(&query, self.params.retrieval_k);
        debug!(
            "Retrieved {} chunks for question ({} requested)",
            hits.len(),
            self.params.retrieval_k
        );

        let context = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = GROUNDED_TEMPLATE
            .replace("{system}", SYSTEM_PROMPT)
            .replace("{context}", &context)
            .replace("{question}", question);

        let answer = self
            .model
            .generate(&prompt, self.memory.as_pairs())
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        self.memory.append(question, &answer);

        let sources = hits
            .into_iter()
            .map(|hit| SourceChunk {
                package_name: hit.chunk.metadata.package_name,
                text: hit.chunk.text,
                formatted_content: hit.chunk.metadata.formatted_content,
                score: hit.score,
            })
            .collect();

        Ok(AnswerEnvelope { answer, sources })
    }

    /// Prior turns retained in the conversation window, oldest first
    #[inline]
    pub fn history(&self) -> &[ConversationTurn] {
        self.memory.as_pairs()
    }

    #[inline]
    pub fn clear_history(&mut self) {
        self.memory.clear();
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}
