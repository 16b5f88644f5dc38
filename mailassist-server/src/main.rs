use std::sync::Arc;

use anyhow::Context;
use mailassist_agent::{EmailAssistant, GeminiClient, default_tools};
use mailassist_rag::{IngestionPipeline, RecursiveChunker, VectorStore};
use mailassist_server::{AppConfig, AppState, DailyQuota, init_tracing, run_server};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(std::env::var("LOG_FORMAT").ok().as_deref());

    let config = AppConfig::from_env().context("invalid configuration")?;
    config.ensure_dirs().context("failed to create data directories")?;

    let embedder = config.embedding.build_provider(&config.google_api_key)?;
    let store = Arc::new(VectorStore::new(embedder));
    match store.load(&config.vector_store_path).await {
        Ok(true) => {
            let chunk_count = store.len().await;
            info!(path = %config.vector_store_path.display(), chunk_count, "vector index loaded");
        }
        Ok(false) => warn!(path = %config.vector_store_path.display(), "no vector index found, call /ingest to build one"),
        Err(e) => error!(error = %e, "vector index could not be loaded, starting with an empty index"),
    }

    let llm = Arc::new(GeminiClient::new(config.google_api_key.as_str(), config.gemini_model.as_str())?);
    let assistant = Arc::new(EmailAssistant::new(llm, default_tools(store.clone(), config.rag.top_k), config.agent));

    let pipeline = IngestionPipeline::builder()
        .chunker(Arc::new(RecursiveChunker::from_config(&config.rag)))
        .store(store)
        .documents_dir(&config.documents_dir)
        .index_path(&config.vector_store_path)
        .build()?;

    info!(
        model = %config.gemini_model,
        embedding = ?config.embedding.backend,
        documents = %config.documents_dir.display(),
        daily_limit = config.daily_request_limit,
        "configuration loaded"
    );

    let state = AppState::new(
        assistant,
        Arc::new(pipeline),
        DailyQuota::new(config.daily_request_limit),
        config.gemini_model.clone(),
    );
    run_server(&config.bind_address(), state, &config.cors_origins).await
}
