//! Router construction, component wiring and the serve loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use lore_core::{AnswerModel, Embeddings, LoreError, MetadataStore, VectorIndex};
use lore_embeddings::{FakeEmbeddings, OpenAiEmbeddings};
use lore_knowledge::KnowledgeCoordinator;
use lore_milvus::MilvusVectorIndex;
use lore_openai::OpenAiAnswerModel;
use lore_sqlite::SqliteMetadataStore;
use lore_vectorindex::InMemoryVectorIndex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{EmbeddingProvider, IndexBackend, LoreConfig};
use crate::routes;

/// Per-request defaults and limits.
#[derive(Debug, Clone)]
pub struct RequestSettings {
    pub default_top_k: usize,
    pub default_page_size: usize,
    pub request_timeout: Duration,
}

impl RequestSettings {
    pub fn from_config(config: &LoreConfig) -> Self {
        Self {
            default_top_k: config.default_top_k,
            default_page_size: config.default_page_size,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self::from_config(&LoreConfig::default())
    }
}

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<KnowledgeCoordinator>,
    pub settings: RequestSettings,
}

impl AppState {
    pub fn new(coordinator: Arc<KnowledgeCoordinator>, settings: RequestSettings) -> Self {
        Self {
            coordinator,
            settings,
        }
    }

    /// Await `fut` under the request timeout. On expiry the future is dropped,
    /// abandoning whatever steps it had left.
    pub async fn run<T>(
        &self,
        fut: impl Future<Output = Result<T, LoreError>>,
    ) -> Result<T, LoreError> {
        let limit = self.settings.request_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| LoreError::Timeout(format!("request exceeded {}s", limit.as_secs())))?
    }
}

/// Build the Axum router with all knowledge routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/knowledge/saveQAndA", post(routes::save_q_and_a))
        .route("/knowledge/upQAndA", post(routes::up_q_and_a))
        .route("/knowledge/saveKnowledge", post(routes::save_knowledge))
        .route("/knowledge/upKnowledge", post(routes::up_knowledge))
        .route("/knowledge/queryQAndA", post(routes::query_q_and_a))
        .route("/knowledge/getList", get(routes::get_list))
        .route("/knowledge/getByGroupKey", get(routes::get_by_group_key))
        .route("/knowledge/delByIds", post(routes::del_by_ids))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Construct every component named by `config` and wire them into a
/// coordinator. Creates the Milvus collection when that backend is chosen.
pub async fn build_state(config: &LoreConfig) -> Result<AppState, LoreError> {
    let provider = EmbeddingProvider::parse(&config.embedding.provider)?;
    let embeddings: Arc<dyn Embeddings> = match provider {
        EmbeddingProvider::OpenAi => {
            Arc::new(OpenAiEmbeddings::new(config.embedding.embeddings_config()))
        }
        EmbeddingProvider::Fake => {
            tracing::warn!("using fake embeddings; search quality is meaningless");
            Arc::new(FakeEmbeddings::new(config.vector_index.dim))
        }
    };

    let index: Arc<dyn VectorIndex> = match IndexBackend::parse(&config.vector_index.backend)? {
        IndexBackend::Milvus => {
            let index = MilvusVectorIndex::new(config.vector_index.milvus_config());
            index.initialize().await?;
            Arc::new(index)
        }
        IndexBackend::Memory => {
            tracing::info!(dim = config.vector_index.dim, "using in-memory vector index");
            Arc::new(InMemoryVectorIndex::with_dimension(config.vector_index.dim))
        }
    };

    let store: Arc<dyn MetadataStore> = Arc::new(SqliteMetadataStore::new(&config.db.path)?);
    let answerer: Arc<dyn AnswerModel> =
        Arc::new(OpenAiAnswerModel::new(config.llm.answer_config()));

    let coordinator = KnowledgeCoordinator::new(embeddings, index, store, answerer);
    Ok(AppState::new(
        Arc::new(coordinator),
        RequestSettings::from_config(config),
    ))
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn serve(config: LoreConfig) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.address).await?;
    tracing::info!(address = %config.address, "lore server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("lore server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
