use axum::{routing::{get, post}, Extension, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::controllers;
use crate::{health_with_pool, AppState};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|Extension(state): Extension<Arc<AppState>>| async move {
            health_with_pool(&state.pool).await
        }))
        .route("/api/chat/send", post(controllers::send_message))
        .route("/api/chat/history/:list_id", get(controllers::history))
        // percorso storico usato dai client della to-do app
        .route("/api/chat/todolist/:list_id", get(controllers::history))
        .route("/ws", get(controllers::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}
