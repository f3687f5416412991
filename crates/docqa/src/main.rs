//! # docqa CLI
//!
//! Command-line interface for docqa, a document question-answering tool.
//!
//! Uploaded PDF, text and Markdown files are chunked, embedded and stored in
//! a local vector index. Questions are answered from the closest chunks by a
//! language model, or extractively when no model is available.
//!
//! ## Commands
//!
//! - `docqa upload <FILE>...` - Add documents to the index
//! - `docqa query <QUESTION>` - Ask a question about the uploaded documents
//! - `docqa list` - List stored documents
//! - `docqa delete <ID>` - Remove a document
//! - `docqa summarize <ID>` - Summarize a document
//! - `docqa status` - Show index statistics
//! - `docqa compact` - Purge vectors of removed documents
//!
//! ## Examples
//!
//! ```bash
//! docqa upload handbook.pdf notes.md
//! docqa query "How many vacation days do I get?" -k 5
//! docqa list --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa_chunker::ChunkerRegistry;
use docqa_core::VectorStore;
use docqa_embed::{
    EmbedderPool, EmbeddingProvider, HashEmbedder, OpenAiConfig, OpenAiEmbedder,
};
use docqa_extract::ExtractorRegistry;
use docqa_index::{IngestService, UploadOutcome};
use docqa_rag::{GenerationProvider, HuggingFaceConfig, HuggingFaceGenerator, RagEngine};
use docqa_store::DocumentIndex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

mod config;

use config::{Config, EmbeddingBackend, GenerationBackend, api_key, ensure_parent};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about your documents")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/docqa/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload documents
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ask a question
    Query {
        /// The question
        question: String,

        /// Chunks to retrieve
        #[arg(short, long)]
        k: Option<usize>,

        /// Keep retrieval order instead of reranking
        #[arg(long)]
        no_rerank: bool,
    },

    /// List stored documents
    List,

    /// Delete a document
    Delete {
        /// Document id
        id: String,
    },

    /// Summarize a document
    Summarize {
        /// Document id
        id: String,
    },

    /// Show index status
    Status,

    /// Purge vector entries left behind by deleted documents
    Compact,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for one upload.
#[derive(Serialize)]
struct UploadItem {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<UploadOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Output structure for answers.
#[derive(Serialize)]
struct AnswerOutput<'a> {
    question: &'a str,
    answer: String,
}

/// Output structure for status.
#[derive(Serialize)]
struct StatusOutput {
    store: String,
    documents: usize,
    live_chunks: usize,
    total_entries: usize,
    orphaned_entries: usize,
    dimension: usize,
    embedding_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    generator: Option<String>,
}

/// The wired-up pipeline.
struct App {
    store_path: PathBuf,
    store: Arc<DocumentIndex>,
    embedder: Arc<EmbedderPool>,
    generator: Option<GenerationProvider>,
    ingest: IngestService,
    rag: RagEngine,
}

/// Build the embedding pool from config.
fn create_embedder(config: &Config) -> Result<Arc<EmbedderPool>> {
    let embedding = &config.embedding;
    let provider = match embedding.provider {
        EmbeddingBackend::Hash => {
            EmbeddingProvider::DirectEncode(Arc::new(HashEmbedder::with_dimension(embedding.dimension)))
        }
        EmbeddingBackend::OpenAi => {
            let key = api_key(&embedding.api_key_env).with_context(|| {
                format!(
                    "Embedding provider is openai but {} is not set",
                    embedding.api_key_env
                )
            })?;
            let embedder = OpenAiEmbedder::new(OpenAiConfig {
                api_key: key,
                base_url: embedding.base_url.clone(),
                model: embedding.model.clone(),
                dimension: embedding.dimension,
                timeout: Duration::from_secs(embedding.timeout_secs),
                max_retries: 3,
                batch_size: embedding.batch_size.max(1),
            })
            .context("Failed to create embedding client")?;
            EmbeddingProvider::from_embedder(Arc::new(embedder))
        }
    };

    info!(
        "Embedding with {} ({} dims, {})",
        provider.model_name(),
        provider.dimension(),
        provider.kind()
    );
    Ok(Arc::new(EmbedderPool::new(provider, config.pool_config())))
}

/// Build the generation provider, if one is configured and usable.
fn create_generator(config: &Config) -> Result<Option<GenerationProvider>> {
    let generation = &config.generation;
    match generation.provider {
        GenerationBackend::None => Ok(None),
        GenerationBackend::HuggingFace => {
            let Some(key) = api_key(&generation.api_key_env) else {
                warn!(
                    "{} is not set; answers will be extractive",
                    generation.api_key_env
                );
                return Ok(None);
            };
            let timeout = Duration::from_secs(generation.timeout_secs);
            let generator = HuggingFaceGenerator::new(HuggingFaceConfig {
                api_key: key,
                base_url: generation.base_url.clone(),
                model: generation.model.clone(),
                max_new_tokens: generation.max_new_tokens,
                temperature: generation.temperature,
                timeout,
            })
            .context("Failed to create generation client")?;
            Ok(Some(GenerationProvider::new(Arc::new(generator), timeout)))
        }
    }
}

/// Create the standard component stack.
async fn create_app(config: &Config) -> Result<App> {
    let embedder = create_embedder(config)?;
    let generator = create_generator(config)?;

    let store_path = config.store_path()?;
    ensure_parent(&store_path)?;
    let store = Arc::new(DocumentIndex::open(&store_path, embedder.dimension()).await);

    let ingest = IngestService::new(
        store.clone(),
        Arc::new(ExtractorRegistry::with_defaults()),
        Arc::new(ChunkerRegistry::with_defaults()),
        embedder.clone(),
        config.ingest_config(),
    );
    let rag = RagEngine::new(
        store.clone(),
        embedder.clone(),
        generator.clone(),
        config.rag_config(),
    );

    Ok(App {
        store_path,
        store,
        embedder,
        generator,
        ingest,
        rag,
    })
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config.logging.level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    if let Commands::Config { action } = &cli.command {
        return run_config(action, &config, cli.format);
    }

    let app = create_app(&config).await?;

    match cli.command {
        Commands::Upload { files } => upload(&app, &files, cli.format).await?,

        Commands::Query {
            question,
            k,
            no_rerank,
        } => {
            let rag_config = app.rag.config();
            let k = k.unwrap_or(rag_config.top_k);
            let rerank = rag_config.rerank && !no_rerank;
            let answer = app.rag.query_with(&question, k, rerank).await;
            match cli.format {
                OutputFormat::Json => print_json(&AnswerOutput {
                    question: &question,
                    answer,
                })?,
                OutputFormat::Text => println!("{answer}"),
            }
        }

        Commands::List => {
            let documents = app.store.get_all_documents().await;
            match cli.format {
                OutputFormat::Json => print_json(&documents)?,
                OutputFormat::Text => {
                    if documents.is_empty() {
                        println!("No documents uploaded.");
                    }
                    for doc in &documents {
                        let uploaded = doc.upload_time.format("%Y-%m-%d %H:%M:%S").to_string();
                        println!(
                            "{}  {}  {} chunks  {}",
                            short_id(&doc.id),
                            uploaded,
                            doc.chunk_count,
                            doc.filename
                        );
                    }
                }
            }
        }

        Commands::Delete { id } => {
            let removed = app.store.remove_document(&id).await;
            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({ "id": id, "removed": removed }))?,
                OutputFormat::Text if removed => println!("Deleted {id}"),
                OutputFormat::Text => println!("Document not found: {id}"),
            }
        }

        Commands::Summarize { id } => {
            let summary = app.rag.summarize_document(&id).await;
            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({ "id": id, "summary": summary }))?,
                OutputFormat::Text => println!("{summary}"),
            }
        }

        Commands::Status => {
            let stats = app.store.stats().await;
            let output = StatusOutput {
                store: app.store_path.display().to_string(),
                documents: stats.documents,
                live_chunks: stats.live_chunks,
                total_entries: stats.total_entries,
                orphaned_entries: stats.orphaned_entries,
                dimension: stats.dimension,
                embedding_model: app.embedder.model_name().to_string(),
                generator: app.generator.as_ref().map(|g| g.name().to_string()),
            };
            match cli.format {
                OutputFormat::Json => print_json(&output)?,
                OutputFormat::Text => {
                    println!("Store: {}", output.store);
                    println!("  Documents: {}", output.documents);
                    println!("  Chunks:    {}", output.live_chunks);
                    println!(
                        "  Vectors:   {} ({} orphaned)",
                        output.total_entries, output.orphaned_entries
                    );
                    println!(
                        "  Embedding: {} ({} dims)",
                        output.embedding_model, output.dimension
                    );
                    println!(
                        "  Generator: {}",
                        output.generator.as_deref().unwrap_or("none (extractive answers)")
                    );
                }
            }
        }

        Commands::Compact => {
            let purged = app
                .store
                .compact()
                .await
                .context("Failed to compact store")?;
            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({ "purged": purged }))?,
                OutputFormat::Text => println!("Purged {purged} orphaned vectors"),
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Upload each file, reporting per-file results.
async fn upload(app: &App, files: &[PathBuf], format: OutputFormat) -> Result<()> {
    let mut items = Vec::with_capacity(files.len());
    for path in files {
        let file = path.display().to_string();
        let result = match tokio::fs::read(path).await {
            Ok(data) => {
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| file.clone());
                app.ingest
                    .upload(&filename, &data)
                    .await
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(format!("failed to read file: {e}")),
        };

        match result {
            Ok(outcome) => items.push(UploadItem {
                file,
                outcome: Some(outcome),
                error: None,
            }),
            Err(error) => {
                warn!("Upload of {} failed: {}", file, error);
                items.push(UploadItem {
                    file,
                    outcome: None,
                    error: Some(error),
                });
            }
        }
    }

    match format {
        OutputFormat::Json => print_json(&items)?,
        OutputFormat::Text => {
            for item in &items {
                match (&item.outcome, &item.error) {
                    (
                        Some(UploadOutcome::Stored {
                            document_id,
                            chunk_count,
                            ..
                        }),
                        _,
                    ) => println!("Stored {} as {} ({} chunks)", item.file, document_id, chunk_count),
                    (Some(UploadOutcome::AlreadyProcessed { document_id, .. }), _) => {
                        println!("Already processed {} ({})", item.file, document_id);
                    }
                    (None, Some(error)) => eprintln!("Failed {}: {}", item.file, error),
                    (None, None) => {}
                }
            }
        }
    }

    let failed = items.iter().filter(|item| item.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} uploads failed", items.len());
    }
    Ok(())
}

fn run_config(action: &ConfigAction, config: &Config, format: OutputFormat) -> Result<()> {
    match action {
        ConfigAction::Show => match format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(config).context("Failed to serialize config")?
                );
            }
            OutputFormat::Text => {
                println!(
                    "{}",
                    toml::to_string_pretty(config).context("Failed to serialize config")?
                );
            }
        },
        ConfigAction::Init => {
            println!("{}", Config::sample_toml());
        }
        ConfigAction::Path => {
            if let Some(path) = Config::config_path() {
                println!("{}", path.display());
            } else {
                println!("Could not determine config directory");
            }
        }
    }
    Ok(())
}

/// First 16 characters of a document id for listings.
fn short_id(id: &str) -> String {
    id.chars().take(16).collect()
}
