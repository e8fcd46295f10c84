
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::store::StoredChunk;
use super::{ChunkMetadata, CorpusMetadata, PackageInfo};
use crate::embeddings::HashEmbedder;
use crate::ChatError;

const CORPUS_EXTENSIONS: &[&str] = &["sql", "pks", "pkb"];

/// Builds the persisted index files from a directory of PL/SQL sources.
///
/// Each source file becomes one chunk: package-level granularity matches
/// how the corpus was annotated. An optional annotations file (same JSON
/// shape as the corpus metadata) supplies purposes and routine listings.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    embedder: HashEmbedder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub chunk_count: usize,
    pub annotated_count: usize,
}

impl IndexBuilder {
    #[inline]
    pub fn new(embedder: HashEmbedder) -> Self {
        Self { embedder }
    }

    /// Index every PL/SQL source under `corpus_dir` and write the vectors
    /// file, the chunk mapping file, and the package metadata file.
    #[inline]
    pub fn build(
        &self,
        corpus_dir: &Path,
        annotations_path: Option<&Path>,
        vectors_path: &Path,
        chunks_path: &Path,
        metadata_path: &Path,
    ) -> crate::Result<BuildSummary> {
        let sources = collect_sources(corpus_dir)?;
        if sources.is_empty() {
            return Err(ChatError::Config(format!(
                "no PL/SQL sources (.sql/.pks/.pkb) found in {}",
                corpus_dir.display()
            )));
        }

        let annotations = match annotations_path {
            Some(path) => index_annotations(path)?,
            None => HashMap::new(),
        };

        info!(
            "Indexing {} source files from {}",
            sources.len(),
            corpus_dir.display()
        );

        let progress = ProgressBar::new(sources.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut stored = Vec::with_capacity(sources.len());
        let mut embeddings = Vec::with_capacity(sources.len());
        let mut packages = Vec::with_capacity(sources.len());
        let mut annotated_count = 0;

        for path in &sources {
            let package_name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_uppercase())
                .unwrap_or_default();
            progress.set_message(package_name.clone());

            let source = std::fs::read_to_string(path)?;
            let annotation = annotations.get(&package_name);
            if annotation.is_some() {
                annotated_count += 1;
            } else {
                debug!("No annotation for package {}", package_name);
            }

            let purpose = annotation
                .map(|info| info.purpose.clone())
                .unwrap_or_else(|| leading_comment(&source));
            let routines = annotation.map(|info| info.routines.clone()).unwrap_or_default();

            embeddings.push(self.embedder.embed(&source));
            packages.push(PackageInfo {
                package_name: package_name.clone(),
                purpose: purpose.clone(),
                routines: routines.clone(),
            });
            stored.push(StoredChunk {
                text: source.clone(),
                metadata: ChunkMetadata {
                    package_name,
                    purpose,
                    formatted_content: source,
                    routines,
                },
            });

            progress.inc(1);
        }
        progress.finish_and_clear();

        write_json(vectors_path, &embeddings)?;
        write_json(chunks_path, &stored)?;
        write_json(metadata_path, &CorpusMetadata { packages })?;

        info!(
            "Wrote index with {} chunks ({} annotated)",
            stored.len(),
            annotated_count
        );
        Ok(BuildSummary {
            chunk_count: stored.len(),
            annotated_count,
        })
    }
}

fn collect_sources(corpus_dir: &Path) -> crate::Result<Vec<std::path::PathBuf>> {
    if !corpus_dir.is_dir() {
        return Err(ChatError::Config(format!(
            "corpus directory not found: {}",
            corpus_dir.display()
        )));
    }

    let mut sources: Vec<_> = std::fs::read_dir(corpus_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| CORPUS_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .collect();

    // Deterministic chunk IDs across rebuilds
    sources.sort();
    Ok(sources)
}

fn index_annotations(path: &Path) -> crate::Result<HashMap<String, PackageInfo>> {
    let metadata = CorpusMetadata::load(path)?;
    if metadata.packages.is_empty() {
        warn!("Annotations file {} held no packages", path.display());
    }
    Ok(metadata
        .packages
        .into_iter()
        .map(|info| (info.package_name.to_uppercase(), info))
        .collect())
}

/// First `--` comment line of the source, used as a fallback purpose.
fn leading_comment(source: &str) -> String {
    source
        .lines()
        .map(str::trim)
        .take_while(|line| line.is_empty() || line.starts_with("--"))
        .find(|line| line.starts_with("--"))
        .map(|line| line.trim_start_matches('-').trim().to_string())
        .unwrap_or_default()
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| ChatError::Other(anyhow::anyhow!("serialization failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}
