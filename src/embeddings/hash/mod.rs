
use sha2::{Digest, Sha256};
use tracing::debug;

pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Deterministic hash-based embedder.
///
/// Maps text to a fixed-length, L2-normalized vector by reinterpreting the
/// SHA-256 digest as floats. The same text always yields the same vector.
/// There is no semantic similarity here; this baseline exists so the
/// retrieval pipeline is fully testable without a learned embedding model,
/// and a real model can be substituted behind the same contract.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSION)
    }
}

impl HashEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a single text into a vector of exactly `dimension` floats.
    ///
    /// The result has unit L2 norm, except for the degenerate all-zero
    /// vector which is returned unmodified.
    #[inline]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());

        // Four digest bytes per float, matching the original 8-hex-char
        // stride: value / 2^32 - 1 lands in [-1, 0).
        let mut values: Vec<f32> = digest
            .chunks_exact(4)
            .map(|chunk| {
                let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                (f64::from(word) / 4_294_967_296.0 - 1.0) as f32
            })
            .collect();

        values.resize(self.dimension, 0.0);
        values.truncate(self.dimension);

        l2_normalize(&mut values);
        values
    }

    /// Embed a batch of texts, one vector per input, in order.
    #[inline]
    pub fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        debug!("Embedding batch of {} texts", texts.len());
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

fn l2_normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in values.iter_mut() {
            *value /= norm;
        }
    }
}
