//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_SERVER__PORT`).
//! Paths in settings may use `~` and `${VAR}`; see [`expand_path`].

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::chunker::{Chunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::debug!(env = other, "no environment-specific config file"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Self::from_figment(figment)
    }

    /// Wraps an already assembled figment; validates the typed settings eagerly.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::Configuration(format!("Failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::Configuration(format!("Failed to extract settings: {e}")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub server: ServerSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.chunker()?;
        if self.embedding.dimension == 0 {
            return Err(Error::Configuration("embedding.dimension must be positive".to_string()));
        }
        if self.retrieval.default_top_k == 0 {
            return Err(Error::Configuration("retrieval.default_top_k must be positive".to_string()));
        }
        if self.retrieval.max_top_k < self.retrieval.default_top_k {
            return Err(Error::Configuration(format!(
                "retrieval.max_top_k ({}) is below retrieval.default_top_k ({})",
                self.retrieval.max_top_k, self.retrieval.default_top_k
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub docs_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { docs_dir: "docs".to_string() }
    }
}

impl DataSettings {
    pub fn docs_dir(&self) -> PathBuf { expand_path(&self.docs_dir) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, overlap: DEFAULT_OVERLAP }
    }
}

impl ChunkingSettings {
    pub fn chunker(&self) -> Result<Chunker> { Chunker::new(self.chunk_size, self.overlap) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// all-MiniLM-L6-v2 through candle.
    Minilm,
    /// Deterministic token-hash vectors; no model files required.
    Hash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<String>,
    pub dimension: usize,
    pub max_len: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { backend: EmbeddingBackend::Minilm, model_dir: None, dimension: 384, max_len: 256 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { default_top_k: 3, max_top_k: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
