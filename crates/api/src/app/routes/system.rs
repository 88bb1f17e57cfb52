use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::services::AppServices;

/// Liveness plus the outcome of the startup bootstrap.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    let master_accounts = if services.bootstrap_report().is_degraded() {
        "degraded"
    } else {
        "ready"
    };
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "master_accounts": master_accounts,
        })),
    )
}
