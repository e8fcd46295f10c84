
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use super::{ChunkMetadata, DocumentChunk};
use crate::ChatError;

/// Chunk record as persisted in the ID-to-chunk mapping file.
///
/// Internal IDs are positional: record `i` pairs with embedding `i` in the
/// vectors file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Similarity-search structure over embedded document chunks.
///
/// Loaded once per process from two persisted files and immutable after
/// load, so it can be shared read-only across sessions without locking.
#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<DocumentChunk>,
}

/// A retrieved chunk with its relevance score (cosine similarity).
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: DocumentChunk,
    pub score: f32,
}

impl VectorIndex {
    /// Load the index from its two backing files.
    ///
    /// Both files must exist and be non-empty before deserialization is
    /// attempted; a missing file and a malformed file are reported as
    /// distinct failures.
    #[inline]
    pub fn load(vectors_path: &Path, chunks_path: &Path) -> crate::Result<Self> {
        let vectors_raw = read_index_file(vectors_path)?;
        let chunks_raw = read_index_file(chunks_path)?;

        let embeddings: Vec<Vec<f32>> = serde_json::from_str(&vectors_raw).map_err(|e| {
            ChatError::IndexUnreadable(format!("vectors file {}: {}", vectors_path.display(), e))
        })?;
        let stored: Vec<StoredChunk> = serde_json::from_str(&chunks_raw).map_err(|e| {
            ChatError::IndexUnreadable(format!("chunks file {}: {}", chunks_path.display(), e))
        })?;

        if embeddings.len() != stored.len() {
            return Err(ChatError::IndexUnreadable(format!(
                "vector count {} does not match chunk count {}",
                embeddings.len(),
                stored.len()
            )));
        }

        if let Some(first) = embeddings.first() {
            let dimension = first.len();
            if embeddings.iter().any(|v| v.len() != dimension) {
                return Err(ChatError::IndexUnreadable(
                    "inconsistent embedding dimensions in vectors file".to_string(),
                ));
            }
        }

        let chunks: Vec<DocumentChunk> = stored
            .into_iter()
            .zip(embeddings)
            .map(|(record, embedding)| DocumentChunk {
                text: record.text,
                embedding,
                metadata: record.metadata,
            })
            .collect();

        info!(
            "Loaded vector index with {} chunks from {}",
            chunks.len(),
            vectors_path.display()
        );
        Ok(Self { chunks })
    }

    /// Number of indexed chunks
    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimension, if the index holds any chunks
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.chunks.first().map(|chunk| chunk.embedding.len())
    }

    /// All indexed chunks, in storage order
    #[inline]
    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    /// K-nearest-neighbor search by cosine similarity.
    ///
    /// Returns at most `k` hits sorted by non-increasing score; `k` is
    /// clamped to the index size, and an empty index yields an empty
    /// result rather than an error.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .chunks
            .iter()
            .map(|chunk| SearchHit {
                chunk: chunk.clone(),
                score: cosine_similarity(query, &chunk.embedding),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k.min(self.chunks.len()));

        debug!("Search returned {} of {} requested hits", hits.len(), k);
        hits
    }
}

fn read_index_file(path: &Path) -> crate::Result<String> {
    if !path.exists() {
        return Err(ChatError::IndexMissing(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ChatError::IndexUnreadable(format!("{}: {}", path.display(), e)))?;

    if content.trim().is_empty() {
        return Err(ChatError::IndexUnreadable(format!(
            "{}: file is empty",
            path.display()
        )));
    }

    Ok(content)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
