//! Configuration handling for docqa.
//!
//! Loaded from `config.toml` in the config directory. Every field has a
//! default, so a missing file or a partial file is fine. API keys are read
//! from the environment variables the config names, never from the file.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use docqa_core::ChunkConfig;
use docqa_embed::PoolConfig;
use docqa_index::IngestConfig;
use docqa_rag::RagConfig;

const CONFIG_FILE: &str = "config.toml";
const STORE_FILE: &str = "store.json";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Default location of the config file.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Commented sample config with every default spelled out.
    pub fn sample_toml() -> &'static str {
        SAMPLE_TOML
    }

    /// Where the store lives: `[store] path`, else the data directory.
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()
                .context("Failed to get data directory")?
                .join(STORE_FILE)),
        }
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            chunk_size: self.chunking.chunk_size,
            overlap: self.chunking.overlap,
        }
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            allowed_extensions: self
                .upload
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            max_bytes: self.upload.max_bytes,
            chunk_config: self.chunk_config(),
            chunk_strategy: Some(self.chunking.strategy.clone()),
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_concurrent: self.embedding.max_concurrent.max(1),
            timeout: Duration::from_secs(self.embedding.timeout_secs),
            cache_capacity: (self.embedding.cache_size > 0).then_some(self.embedding.cache_size),
        }
    }

    pub fn rag_config(&self) -> RagConfig {
        RagConfig {
            top_k: self.query.top_k,
            rerank: self.query.rerank,
            max_context_chunks: self.query.max_context_chunks,
            summary_char_budget: self.query.summary_char_budget,
        }
    }
}

/// Store-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Store file; defaults to `store.json` in the data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Chunking-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunker name (`semantic` or `fixed`)
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Target chunk size (characters)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between chunks (characters)
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

fn default_strategy() -> String {
    "semantic".to_string()
}

fn default_chunk_size() -> usize {
    ChunkConfig::default().chunk_size
}

fn default_overlap() -> usize {
    ChunkConfig::default().overlap
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Offline feature hashing
    #[default]
    Hash,
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAi,
}

/// Embedding-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingBackend,

    /// Vector dimension
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Remote model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,

    /// Inputs per remote request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Max concurrent embedding calls
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cached document embeddings; 0 disables the cache
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_dimension() -> usize {
    docqa_embed::hashing::DEFAULT_DIMENSION
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_max_concurrent() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_size() -> usize {
    docqa_embed::cache::DEFAULT_CACHE_SIZE
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::default(),
            dimension: default_dimension(),
            model: default_embedding_model(),
            base_url: default_embedding_url(),
            api_key_env: default_embedding_key_env(),
            batch_size: default_batch_size(),
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout_secs(),
            cache_size: default_cache_size(),
        }
    }
}

/// Which language-model backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    /// Answer extractively from retrieved passages
    None,
    /// Hugging Face inference API
    #[default]
    HuggingFace,
}

/// Generation-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationBackend,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_generation_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_generation_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generation_model() -> String {
    docqa_rag::huggingface::DEFAULT_MODEL.to_string()
}

fn default_generation_url() -> String {
    docqa_rag::huggingface::DEFAULT_BASE_URL.to_string()
}

fn default_generation_key_env() -> String {
    "HUGGINGFACE_API_KEY".to_string()
}

fn default_max_new_tokens() -> u32 {
    200
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationBackend::default(),
            model: default_generation_model(),
            base_url: default_generation_url(),
            api_key_env: default_generation_key_env(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Query-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Rerank retrieved chunks
    #[serde(default = "default_rerank")]
    pub rerank: bool,

    /// Passages included in the prompt
    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,

    /// Characters of document text used for summaries
    #[serde(default = "default_summary_char_budget")]
    pub summary_char_budget: usize,
}

fn default_top_k() -> usize {
    RagConfig::default().top_k
}

fn default_rerank() -> bool {
    true
}

fn default_max_context_chunks() -> usize {
    RagConfig::default().max_context_chunks
}

fn default_summary_char_budget() -> usize {
    RagConfig::default().summary_char_budget
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            rerank: default_rerank(),
            max_context_chunks: default_max_context_chunks(),
            summary_char_budget: default_summary_char_budget(),
        }
    }
}

/// Upload-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Maximum upload size (bytes)
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_allowed_extensions() -> Vec<String> {
    IngestConfig::default().allowed_extensions
}

fn default_max_bytes() -> usize {
    docqa_index::DEFAULT_MAX_BYTES
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_bytes: default_max_bytes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Get the data directory for docqa.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCQA_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "docqa").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the config directory for docqa.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCQA_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "docqa").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Read an API key from the named environment variable.
pub fn api_key(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .filter(|key| !key.trim().is_empty())
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display())),
        _ => Ok(()),
    }
}

const SAMPLE_TOML: &str = r#"# docqa configuration

[store]
# path = "/var/lib/docqa/store.json"

[chunking]
strategy = "semantic"   # or "fixed"
chunk_size = 1000
overlap = 200

[embedding]
provider = "hash"       # or "openai"
dimension = 384
model = "text-embedding-3-small"
base_url = "https://api.openai.com/v1"
api_key_env = "OPENAI_API_KEY"
batch_size = 32
max_concurrent = 4
timeout_secs = 30
cache_size = 10000

[generation]
provider = "huggingface"  # or "none"
model = "google/flan-t5-base"
base_url = "https://api-inference.huggingface.co"
api_key_env = "HUGGINGFACE_API_KEY"
max_new_tokens = 200
temperature = 0.7
timeout_secs = 30

[query]
top_k = 3
rerank = true
max_context_chunks = 5
summary_char_budget = 4000

[upload]
allowed_extensions = ["pdf", "txt", "md"]
max_bytes = 16777216

[logging]
level = "info"
"#;
