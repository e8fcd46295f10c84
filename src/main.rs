use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use plsql_chat::commands::{
    build_index, chat, list_models, list_packages, show_config, show_kb, show_status,
};
use plsql_chat::config::{Config, default_data_dir};

#[derive(Parser)]
#[command(name = "plsql-chat")]
#[command(about = "Conversational question answering over an annotated PL/SQL chess engine corpus")]
#[command(version)]
struct Cli {
    /// Override the data directory holding config, index, and transcripts
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// Show backend, index, and metadata health
    Status,
    /// List the models the configured backend advertises
    Models,
    /// Browse the annotated corpus packages
    Packages,
    /// Build the vector index from a corpus directory
    Index {
        /// Directory containing the PL/SQL sources (.sql/.pks/.pkb)
        corpus_dir: PathBuf,
        /// Optional annotations file supplying purposes and routines
        #[arg(long)]
        annotations: Option<PathBuf>,
    },
    /// Show the knowledge-base document
    Kb {
        /// Path of the knowledge-base markdown file
        #[arg(long, default_value = "docs/knowledge_base.md")]
        file: PathBuf,
        /// Show a single section by title
        #[arg(long)]
        section: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir().context("Could not determine a data directory")?,
    };
    let config = Config::load(&data_dir)?;

    match cli.command {
        Commands::Chat => chat(&config)?,
        Commands::Status => show_status(&config)?,
        Commands::Models => list_models(&config)?,
        Commands::Packages => list_packages(&config)?,
        Commands::Index {
            corpus_dir,
            annotations,
        } => build_index(&config, &corpus_dir, annotations.as_deref())?,
        Commands::Kb { file, section } => show_kb(&file, section.as_deref())?,
        Commands::Config => show_config(&config)?,
    }

    Ok(())
}
