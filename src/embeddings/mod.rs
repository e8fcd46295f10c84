// Embeddings module
// Deterministic text-to-vector mapping used for both indexing and querying

pub mod hash;

pub use hash::{DEFAULT_EMBEDDING_DIMENSION, HashEmbedder};
