//! TOML configuration parsing.
//!
//! Every section is optional; omitted keys fall back to the values of the
//! reference classroom deployment (Ollama on localhost, docs under `./docs`).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
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
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Directory holding `procedures.txt`, `syllabus.txt` and `faq.csv`.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
    /// Directory receiving one `unknowns_<teacher>.csv` per teacher.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    /// JSON policy document, loaded once at startup.
    #[serde(default = "default_policy_path")]
    pub policy: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            logs_dir: default_logs_dir(),
            policy: default_policy_path(),
        }
    }
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("./docs")
}
fn default_logs_dir() -> PathBuf {
    PathBuf::from("./logs")
}
fn default_policy_path() -> PathBuf {
    PathBuf::from("./docs/policy.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_per_source_chars")]
    pub per_source_chars: usize,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            per_source_chars: default_per_source_chars(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_per_source_chars() -> usize {
    2000
}
fn default_max_context_chars() -> usize {
    4000
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Phrase the model is told to answer with when the context does not
    /// cover the question. Its presence in a reply marks the reply uncertain.
    #[serde(default = "default_uncertainty_phrase")]
    pub uncertainty_phrase: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            uncertainty_phrase: default_uncertainty_phrase(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.1:8b".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_uncertainty_phrase() -> String {
    "Ask your teacher".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate retrieval caps
    if config.retrieval.per_source_chars == 0 {
        anyhow::bail!("retrieval.per_source_chars must be > 0");
    }
    if config.retrieval.max_context_chars == 0 {
        anyhow::bail!("retrieval.max_context_chars must be > 0");
    }
    if config.retrieval.per_source_chars > config.retrieval.max_context_chars {
        anyhow::bail!("retrieval.per_source_chars must be <= retrieval.max_context_chars");
    }

    // Validate generation
    if config.generation.timeout_secs == 0 {
        anyhow::bail!("generation.timeout_secs must be > 0");
    }
    if config.generation.uncertainty_phrase.trim().is_empty() {
        anyhow::bail!("generation.uncertainty_phrase must not be empty");
    }
    let url = config.generation.base_url.as_str();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!(
            "generation.base_url must start with http:// or https://, got '{}'",
            url
        );
    }

    Ok(())
}
