use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use pagetalk_llm::CompletionClient;
use pagetalk_web::ScrapeOrchestrator;

use crate::chat::{chat_handler, ConversationStore};

/// Shared handles behind every request.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ScrapeOrchestrator,
    pub completions: Arc<dyn CompletionClient>,
    pub conversations: ConversationStore,
    pub max_context_turns: usize,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/healthz", get(healthz))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
