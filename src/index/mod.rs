// Vector index module
// Similarity search over embedded corpus chunks plus package metadata.
// The index is loaded once from disk and immutable afterwards.

pub mod builder;
pub mod cache;
pub mod store;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub use builder::{BuildSummary, IndexBuilder};
pub use cache::IndexCache;
pub use store::{SearchHit, VectorIndex};

/// Immutable unit of indexed content.
///
/// Created at index-build time; read-only for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub package_name: String,
    pub purpose: String,
    pub formatted_content: String,
    #[serde(default)]
    pub routines: Vec<RoutineInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub routine_type: String,
    #[serde(default)]
    pub parameters: String,
}

/// Corpus-level package descriptions backing the package explorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusMetadata {
    #[serde(default)]
    pub packages: Vec<PackageInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub package_name: String,
    pub purpose: String,
    #[serde(default)]
    pub routines: Vec<RoutineInfo>,
}

impl CorpusMetadata {
    /// Load package metadata from a JSON file with a top-level `packages` key.
    ///
    /// A missing file is tolerated and yields empty metadata; a present but
    /// malformed file is an error.
    #[inline]
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            warn!("Metadata file not found at {}, continuing without package metadata", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let metadata: Self = serde_json::from_str(&content).map_err(|e| {
            crate::ChatError::IndexUnreadable(format!(
                "metadata file {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(
            "Loaded metadata for {} packages from {}",
            metadata.packages.len(),
            path.display()
        );
        Ok(metadata)
    }
}
