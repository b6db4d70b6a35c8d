use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            collection: default_collection(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./storage")
}
fn default_collection() -> String {
    "knowledge_agent".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_overlap")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap(),
        }
    }
}

fn default_max_tokens() -> usize {
    1000
}
fn default_overlap() -> usize {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

fn default_top_k() -> usize {
    4
}
fn default_max_context_tokens() -> usize {
    4000
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7878".to_string()
}

impl Config {
    /// Path of the SQLite database file inside the storage directory.
    pub fn db_path(&self) -> PathBuf {
        self.storage.dir.join("knowledge-agent.sqlite")
    }
}

/// Load configuration from a TOML file. A missing file is not an error:
/// every field has a documented default, so the file is optional.
///
/// `OPENAI_CHAT_MODEL` and `OPENAI_EMBEDDING_MODEL` environment variables
/// override the corresponding model names when set.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    if let Ok(model) = std::env::var("OPENAI_CHAT_MODEL") {
        if !model.trim().is_empty() {
            config.openai.chat_model = model;
        }
    }
    if let Ok(model) = std::env::var("OPENAI_EMBEDDING_MODEL") {
        if !model.trim().is_empty() {
            config.openai.embedding_model = model;
        }
    }

    // Validate chunking
    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }
    if config.chunking.overlap_tokens >= config.chunking.max_tokens {
        anyhow::bail!(
            "chunking.overlap_tokens ({}) must be strictly less than chunking.max_tokens ({})",
            config.chunking.overlap_tokens,
            config.chunking.max_tokens
        );
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate embedding settings
    if config.openai.dims == 0 {
        anyhow::bail!("openai.dims must be > 0");
    }
    if config.openai.batch_size == 0 {
        anyhow::bail!("openai.batch_size must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/knowledge-agent.toml")).unwrap();
        assert_eq!(config.chunking.max_tokens, 1000);
        assert_eq!(config.chunking.overlap_tokens, 150);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.storage.collection, "knowledge_agent");
        assert_eq!(config.openai.embedding_model, "text-embedding-3-small");
    }

    #[test]
    fn overlap_must_be_less_than_max() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ka.toml");
        std::fs::write(
            &path,
            "[chunking]\nmax_tokens = 100\noverlap_tokens = 100\n",
        )
        .unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("overlap_tokens"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ka.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 8\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.chunking.max_tokens, 1000);
    }
}
