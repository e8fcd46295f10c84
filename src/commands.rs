use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ChatError;
use crate::config::Config;
use crate::embeddings::HashEmbedder;
use crate::engine::{AnswerEnvelope, ChatEngine};
use crate::index::{CorpusMetadata, IndexBuilder, IndexCache, VectorIndex};
use crate::kb;
use crate::memory::ConversationTurn;
use crate::providers::provider_for;

/// Run the interactive question-answering loop.
#[inline]
pub fn chat(config: &Config) -> Result<()> {
    let provider = provider_for(config)?;
    let cache = IndexCache::new();

    let index = match cache.load_cached(&config.vectors_path(), &config.chunks_path()) {
        Ok(index) => index,
        Err(e @ (ChatError::IndexMissing(_) | ChatError::IndexUnreadable(_))) => {
            println!("{} {}", style("Cannot start:").red().bold(), e);
            println!("Build the index first: plsql-chat index <corpus-dir>");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = CorpusMetadata::load(&config.metadata_path())?;

    let mut engine =
        match ChatEngine::initialize(provider.as_ref(), config.params.clone(), Arc::clone(&index)) {
            Ok(engine) => engine,
            Err(e @ (ChatError::ProviderUnreachable(_) | ChatError::ModelConstructionFailed(_))) => {
                println!("{} {}", style("Cannot start:").red().bold(), e);
                println!("Check the backend with: plsql-chat status");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

    println!(
        "{}",
        style("PL/SQL Chess Engine Chat").cyan().bold()
    );
    println!(
        "Corpus: {} chunks, {} annotated packages",
        index.len(),
        metadata.packages.len()
    );
    println!("Commands: /history, /clear, /quit");
    println!();

    loop {
        let line: String = Input::new().with_prompt("you").interact_text()?;
        let question = line.trim();

        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                engine.clear_history();
                println!("{}", style("Conversation history cleared").dim());
            }
            "/history" => print_history(engine.history()),
            _ => match engine.ask(question) {
                Ok(envelope) => print_answer(&envelope),
                Err(ChatError::Generation(msg)) => {
                    warn!("Generation failed: {}", msg);
                    println!(
                        "{} {}",
                        style("Answer failed:").red(),
                        msg
                    );
                    println!("{}", style("You can ask again.").dim());
                }
                Err(e) => return Err(e.into()),
            },
        }
    }

    save_transcript(config, engine.history())?;
    Ok(())
}

fn print_answer(envelope: &AnswerEnvelope) {
    println!();
    println!("{}", envelope.answer.trim());
    if !envelope.sources.is_empty() {
        println!();
        println!("{}", style("Sources:").dim());
        for source in &envelope.sources {
            println!(
                "  {} (score {:.3})",
                style(&source.package_name).green(),
                source.score
            );
        }
    }
    println!();
}

fn print_history(history: &[ConversationTurn]) {
    if history.is_empty() {
        println!("{}", style("No conversation yet").dim());
        return;
    }
    for (i, turn) in history.iter().enumerate() {
        println!("{} {}", style(format!("[{}] you:", i + 1)).bold(), turn.question);
        println!("    {}", turn.answer.trim());
    }
}

/// Write the session transcript as JSON, named by wall-clock timestamp.
fn save_transcript(config: &Config, history: &[ConversationTurn]) -> Result<()> {
    if history.is_empty() {
        return Ok(());
    }

    let dir = config.transcripts_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create transcript directory: {}", dir.display()))?;

    let path = dir.join(format!(
        "chat-{}.json",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));
    let content =
        serde_json::to_string_pretty(history).context("Failed to serialize transcript")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write transcript: {}", path.display()))?;

    info!("Saved transcript with {} turns", history.len());
    println!("Transcript saved to {}", path.display());
    Ok(())
}

/// Show backend, index, and metadata health in one report.
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("PL/SQL Chat Status");
    println!("{}", "=".repeat(40));

    println!("Backend: {}", config.provider);
    let provider = provider_for(config)?;
    if provider.health_check() {
        println!("  {} {} backend is reachable", style("✓").green(), provider.name());
        let models = provider.available_models();
        if models.is_empty() {
            println!("  No models advertised");
        } else {
            println!("  Models: {}", models.join(", "));
        }
    } else {
        println!(
            "  {} {} backend is not reachable",
            style("✗").red(),
            provider.name()
        );
    }

    println!();
    println!("Index:");
    match VectorIndex::load(&config.vectors_path(), &config.chunks_path()) {
        Ok(index) => {
            println!(
                "  {} {} chunks (dimension {})",
                style("✓").green(),
                index.len(),
                index.dimension().unwrap_or(0)
            );
        }
        Err(e) => {
            println!("  {} {}", style("✗").red(), e);
        }
    }

    println!();
    println!("Metadata:");
    match CorpusMetadata::load(&config.metadata_path()) {
        Ok(metadata) => {
            println!(
                "  {} {} annotated packages",
                style("✓").green(),
                metadata.packages.len()
            );
        }
        Err(e) => {
            println!("  {} {}", style("✗").red(), e);
        }
    }

    Ok(())
}

/// List the models the configured backend advertises.
#[inline]
pub fn list_models(config: &Config) -> Result<()> {
    let provider = provider_for(config)?;
    let models = provider.available_models();

    if models.is_empty() {
        println!(
            "No models available from the {} backend (is it running?)",
            provider.name()
        );
        return Ok(());
    }

    println!("Available models ({}):", models.len());
    for model in models {
        println!("  {}", model);
    }
    Ok(())
}

/// Browse the annotated corpus packages.
#[inline]
pub fn list_packages(config: &Config) -> Result<()> {
    let metadata = CorpusMetadata::load(&config.metadata_path())?;

    if metadata.packages.is_empty() {
        println!("No package metadata found.");
        println!("Build the index first: plsql-chat index <corpus-dir>");
        return Ok(());
    }

    println!("Corpus Packages ({} total):", metadata.packages.len());
    println!();
    for package in &metadata.packages {
        println!("{}", style(&package.package_name).cyan().bold());
        if !package.purpose.is_empty() {
            println!("  {}", package.purpose);
        }
        for routine in &package.routines {
            if routine.parameters.is_empty() {
                println!("  - {} {}", routine.routine_type, routine.name);
            } else {
                println!(
                    "  - {} {}({})",
                    routine.routine_type, routine.name, routine.parameters
                );
            }
        }
        println!();
    }
    Ok(())
}

/// Embed the corpus and write the persisted index files.
#[inline]
pub fn build_index(
    config: &Config,
    corpus_dir: &Path,
    annotations: Option<&Path>,
) -> Result<()> {
    let builder = IndexBuilder::new(HashEmbedder::default());
    let summary = builder.build(
        corpus_dir,
        annotations,
        &config.vectors_path(),
        &config.chunks_path(),
        &config.metadata_path(),
    )?;

    println!(
        "{} Indexed {} packages ({} annotated)",
        style("✓").green(),
        summary.chunk_count,
        summary.annotated_count
    );
    println!("Index written to {}", config.vectors_path().display());
    Ok(())
}

/// Show the knowledge-base document, whole or one section.
#[inline]
pub fn show_kb(path: &Path, section: Option<&str>) -> Result<()> {
    let sections = kb::load(path)?;

    match section {
        Some(wanted) => {
            let found = sections
                .iter()
                .find(|s| s.title.eq_ignore_ascii_case(wanted));
            match found {
                Some(section) => {
                    println!("{}", style(&section.title).cyan().bold());
                    println!();
                    println!("{}", kb::section_text(&section.content));
                }
                None => {
                    println!("No section named '{}'. Available sections:", wanted);
                    for section in &sections {
                        println!("  {}", section.title);
                    }
                }
            }
        }
        None => {
            println!("Knowledge base sections ({}):", sections.len());
            for section in &sections {
                println!("  {}", section.title);
            }
            println!();
            println!("Show one with: plsql-chat kb --section <title>");
        }
    }
    Ok(())
}

/// Print the effective configuration.
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("Data directory: {}", config.data_dir.display());
    println!("Provider: {}", config.provider);
    println!();
    println!("[ollama]");
    println!(
        "  url: {}://{}:{}",
        config.ollama.protocol, config.ollama.host, config.ollama.port
    );
    println!("  model: {}", config.ollama.model);
    println!();
    println!("[remote]");
    println!("  endpoint: {}", config.remote.effective_endpoint()?);
    println!("  region: {}", config.remote.region);
    println!("  model_id: {}", config.remote.model_id);
    println!("  api_key_env: {}", config.remote.api_key_env);
    println!();
    println!("[params]");
    println!("  temperature: {}", config.params.temperature);
    println!("  context_length: {}", config.params.context_length);
    println!("  top_k: {}", config.params.top_k);
    println!("  retrieval_k: {}", config.params.retrieval_k);
    Ok(())
}
