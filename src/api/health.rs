use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler.
/// Returns JSON with status and config summary.
pub fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "chat-bridge is running",
        "requests_served": state.requests_served(),
        "config": {
            "backend_chat_url": state.backend.chat_url().as_str(),
            "base_path": state.base_path(),
            "features": {
                "log_level": config.features.log_level,
                "emit_done_sentinel": config.features.emit_done_sentinel,
            }
        }
    }))
}
