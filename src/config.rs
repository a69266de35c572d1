use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.pdf".to_string(),
        "**/*.md".to_string(),
        "**/*.txt".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    250
}

/// Scope of the lexical branch during a query.
///
/// `candidates` scores only the passages the vector branch returned (the
/// cheaper option); `corpus` scores every stored chunk. When the vector
/// branch is empty or unavailable the effective scope is always `corpus`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LexicalScope {
    Corpus,
    Candidates,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Weight of the lexical branch: `fused = w*lexical + (1-w)*vector`.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,
    /// Candidates fetched from the vector branch per query.
    #[serde(default = "default_candidate_k")]
    pub candidate_k: i64,
    /// Fused candidates handed to the re-ranker.
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,
    /// Final results returned per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_lexical_scope")]
    pub lexical_scope: LexicalScope,
    /// Extra stopwords removed during lexical normalization, on top of the
    /// built-in French + English set.
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            keyword_weight: default_keyword_weight(),
            candidate_k: default_candidate_k(),
            rerank_top_n: default_rerank_top_n(),
            top_k: default_top_k(),
            lexical_scope: default_lexical_scope(),
            extra_stopwords: Vec::new(),
        }
    }
}

fn default_keyword_weight() -> f64 {
    0.6
}
fn default_candidate_k() -> i64 {
    40
}
fn default_rerank_top_n() -> usize {
    40
}
fn default_top_k() -> usize {
    10
}
fn default_lexical_scope() -> LexicalScope {
    LexicalScope::Candidates
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_embed_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            max_retries: default_embed_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_embed_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RerankConfig {
    /// `disabled` or `http` (a TEI-style `/rerank` endpoint).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: None,
            model: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RerankConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Chunks stored per storage round-trip. Batches never span documents,
    /// so a batch failure is attributable to exactly one document.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    50
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }

    if !(0.0..=1.0).contains(&config.retrieval.keyword_weight) {
        anyhow::bail!("retrieval.keyword_weight must be in [0.0, 1.0]");
    }
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.candidate_k < 1 {
        anyhow::bail!("retrieval.candidate_k must be >= 1");
    }
    if config.retrieval.rerank_top_n < config.retrieval.top_k {
        anyhow::bail!("retrieval.rerank_top_n must be >= retrieval.top_k");
    }

    if config.indexing.batch_size == 0 {
        anyhow::bail!("indexing.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.rerank.provider.as_str() {
        "disabled" | "http" => {}
        other => anyhow::bail!(
            "Unknown rerank provider: '{}'. Must be disabled or http.",
            other
        ),
    }
    if config.rerank.is_enabled() && config.rerank.endpoint.is_none() {
        anyhow::bail!(
            "rerank.endpoint must be specified when provider is '{}'",
            config.rerank.provider
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    const MINIMAL: &str = r#"
        [db]
        path = "data/quarry.sqlite"
        [corpus]
        root = "docs"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.retrieval.keyword_weight, 0.6);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.rerank_top_n, 40);
        assert_eq!(config.retrieval.lexical_scope, LexicalScope::Candidates);
        assert_eq!(config.indexing.batch_size, 50);
        assert!(!config.embedding.is_enabled());
        assert!(!config.rerank.is_enabled());
    }

    #[test]
    fn keyword_weight_out_of_range_rejected() {
        let toml_str = format!("{MINIMAL}\n[retrieval]\nkeyword_weight = 1.5\n");
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn rerank_top_n_below_top_k_rejected() {
        let toml_str = format!("{MINIMAL}\n[retrieval]\ntop_k = 20\nrerank_top_n = 5\n");
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn openai_provider_requires_model_and_dims() {
        let toml_str = format!("{MINIMAL}\n[embedding]\nprovider = \"openai\"\n");
        assert!(parse(&toml_str).is_err());

        let toml_str = format!(
            "{MINIMAL}\n[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536\n"
        );
        assert!(parse(&toml_str).is_ok());
    }

    #[test]
    fn http_rerank_requires_endpoint() {
        let toml_str = format!("{MINIMAL}\n[rerank]\nprovider = \"http\"\n");
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn lexical_scope_parses() {
        let toml_str = format!("{MINIMAL}\n[retrieval]\nlexical_scope = \"corpus\"\n");
        let config = parse(&toml_str).unwrap();
        assert_eq!(config.retrieval.lexical_scope, LexicalScope::Corpus);
    }
}
