use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(create_transfer))
}

pub async fn create_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::TransferRequest>,
) -> axum::response::Response {
    let from = match dto::parse_identity_id(&body.from) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let to = match dto::parse_identity_id(&body.to) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let amount = match dto::parse_amount(body.amount) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let transfer_id = match dto::parse_transfer_id(body.transfer_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.transfer_with_id(from, to, amount, transfer_id).await {
        Ok(id) => (StatusCode::CREATED, Json(dto::transfer_to_json(id))).into_response(),
        Err(e) => errors::banking_error_to_response(e),
    }
}
