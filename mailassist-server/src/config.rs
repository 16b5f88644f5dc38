//! Service configuration, read from the environment.
//!
//! [`AppConfig::from_env`] loads `.env` (if present) and reads process
//! variables. [`AppConfig::from_lookup`] takes any lookup function so tests
//! never touch the real environment.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use mailassist_agent::{AgentSettings, GeminiClient};
use mailassist_rag::{
    EmbeddingProvider, GeminiEmbeddingProvider, OllamaEmbeddingProvider, OpenAIEmbeddingProvider,
    RagConfig,
};
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8501";
const DEFAULT_DAILY_REQUEST_LIMIT: u32 = 20;
const DOCUMENTS_DIR_NAME: &str = "documents";
const VECTOR_STORE_NAME: &str = "faiss_index";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {message}")]
    Invalid { key: &'static str, value: String, message: String },

    #[error(transparent)]
    Rag(#[from] mailassist_rag::RagError),
}

/// Which embedding backend turns text into vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Ollama,
    OpenAi,
    Gemini,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("unknown embedding provider '{other}', expected ollama, openai or gemini")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model: Option<String>,
    /// Explicit `EMBEDDING_DIMENSIONS`; otherwise the backend's default.
    pub dimensions: Option<usize>,
    pub base_url: Option<String>,
    pub openai_api_key: Option<String>,
}

impl EmbeddingSettings {
    /// Vector length the configured backend produces.
    pub fn resolved_dimensions(&self) -> usize {
        self.dimensions.unwrap_or(match self.backend {
            EmbeddingBackend::Ollama => OllamaEmbeddingProvider::DEFAULT_DIMENSIONS,
            EmbeddingBackend::OpenAi => 1536,
            EmbeddingBackend::Gemini => GeminiEmbeddingProvider::DEFAULT_DIMENSIONS,
        })
    }

    /// Construct the configured provider. `google_api_key` doubles as the
    /// Gemini embedding key.
    pub fn build_provider(&self, google_api_key: &str) -> Result<Arc<dyn EmbeddingProvider>, ConfigError> {
        let dimensions = self.resolved_dimensions();
        let provider: Arc<dyn EmbeddingProvider> = match self.backend {
            EmbeddingBackend::Ollama => {
                let model = self.model.as_deref().unwrap_or(OllamaEmbeddingProvider::DEFAULT_MODEL);
                let mut provider = OllamaEmbeddingProvider::new(model, dimensions);
                if let Some(url) = &self.base_url {
                    provider = provider.with_base_url(url);
                }
                Arc::new(provider)
            }
            EmbeddingBackend::OpenAi => {
                let key = self.openai_api_key.as_deref().ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
                let mut provider = OpenAIEmbeddingProvider::new(key, dimensions)?;
                if let Some(model) = &self.model {
                    provider = provider.with_model(model);
                }
                if let Some(url) = &self.base_url {
                    provider = provider.with_base_url(url);
                }
                if let Some(dims) = self.dimensions {
                    provider = provider.with_request_dimensions(dims);
                }
                Arc::new(provider)
            }
            EmbeddingBackend::Gemini => {
                let mut provider = GeminiEmbeddingProvider::new(google_api_key)?.with_output_dimensionality(dimensions);
                if let Some(model) = &self.model {
                    provider = provider.with_model(model);
                }
                if let Some(url) = &self.base_url {
                    provider = provider.with_base_url(url);
                }
                Arc::new(provider)
            }
        };
        Ok(provider)
    }
}

/// Everything the service needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub google_api_key: String,
    pub gemini_model: String,
    pub agent: AgentSettings,
    pub embedding: EmbeddingSettings,
    pub rag: RagConfig,
    pub documents_dir: PathBuf,
    /// Prefix of the two persisted index files.
    pub vector_store_path: PathBuf,
    /// `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// `/process-email` calls allowed per UTC day; `0` disables the limit.
    pub daily_request_limit: u32,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let google_api_key = get("GOOGLE_API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?;

        let defaults = AgentSettings::default();
        let agent = AgentSettings {
            temperature: parse_or(&get, "AGENT_TEMPERATURE", defaults.temperature)?,
            max_iterations: parse_or(&get, "MAX_ITERATIONS", defaults.max_iterations)?,
            max_output_tokens: parse_or(&get, "MAX_OUTPUT_TOKENS", defaults.max_output_tokens)?,
        };

        let embedding = EmbeddingSettings {
            backend: parse_or(&get, "EMBEDDING_PROVIDER", EmbeddingBackend::Ollama)?,
            model: get("EMBEDDING_MODEL"),
            dimensions: parse_opt(&get, "EMBEDDING_DIMENSIONS")?,
            base_url: get("EMBEDDING_BASE_URL"),
            openai_api_key: get("OPENAI_API_KEY"),
        };

        let rag_defaults = RagConfig::default();
        let rag = RagConfig::builder()
            .chunk_size(parse_or(&get, "CHUNK_SIZE", rag_defaults.chunk_size)?)
            .chunk_overlap(parse_or(&get, "CHUNK_OVERLAP", rag_defaults.chunk_overlap)?)
            .top_k(parse_or(&get, "RETRIEVAL_TOP_K", rag_defaults.top_k)?)
            .build()?;

        let data_root = get("RAILWAY_VOLUME_MOUNT_PATH").map(PathBuf::from);
        let under_root = |name: &str| match &data_root {
            Some(root) => root.join(name),
            None => PathBuf::from(name),
        };

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            google_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| GeminiClient::DEFAULT_MODEL.to_string()),
            agent,
            embedding,
            rag,
            documents_dir: get("DOCUMENTS_DIR").map(PathBuf::from).unwrap_or_else(|| under_root(DOCUMENTS_DIR_NAME)),
            vector_store_path: get("VECTOR_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| under_root(VECTOR_STORE_NAME)),
            cors_origins,
            daily_request_limit: parse_or(&get, "DAILY_REQUEST_LIMIT", DEFAULT_DAILY_REQUEST_LIMIT)?,
        })
    }

    /// Create the documents directory and the index file's parent directory.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.documents_dir)?;
        if let Some(parent) = self.vector_store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    get(key)
        .map(|value| {
            value.parse().map_err(|e: T::Err| ConfigError::Invalid { key, value: value.clone(), message: e.to_string() })
        })
        .transpose()
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}
