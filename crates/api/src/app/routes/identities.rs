use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use ledgerbank_core::{IdentityId, TransferId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register))
        .route("/:id/provision", post(provision))
        .route("/:id/associate", post(associate))
        .route("/:id/balance", get(balance))
        .route("/:id/account", get(account))
        .route("/:id/deposit", post(deposit))
        .route("/:id/withdraw", post(withdraw))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterIdentityRequest>,
) -> axum::response::Response {
    if let Err(resp) = dto::validate_registration(&body) {
        return resp;
    }

    match services.register(body.into()).await {
        Ok(identity) => (StatusCode::CREATED, Json(dto::identity_to_json(&identity))).into_response(),
        Err(e) => errors::banking_error_to_response(e),
    }
}

pub async fn provision(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let identity = match dto::parse_identity_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.provision(identity).await {
        Ok(account_id) => (
            StatusCode::OK,
            Json(serde_json::json!({ "ledger_account_id": account_id.get() })),
        )
            .into_response(),
        Err(e) => errors::banking_error_to_response(e),
    }
}

pub async fn associate(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let identity = match dto::parse_identity_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.associate(identity).await {
        Ok(account_id) => (
            StatusCode::OK,
            Json(serde_json::json!({ "ledger_account_id": account_id.get() })),
        )
            .into_response(),
        Err(e) => errors::banking_error_to_response(e),
    }
}

pub async fn balance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let identity = match dto::parse_identity_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.balance(identity).await {
        Ok(balance) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "identity_id": identity.to_string(),
                "balance": balance,
            })),
        )
            .into_response(),
        Err(e) => errors::banking_error_to_response(e),
    }
}

pub async fn account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let identity = match dto::parse_identity_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.account(identity).await {
        Ok(account) => (StatusCode::OK, Json(dto::account_to_json(&account))).into_response(),
        Err(e) => errors::banking_error_to_response(e),
    }
}

pub async fn deposit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::MovementRequest>,
) -> axum::response::Response {
    let (identity, amount, transfer_id) = match parse_movement(&id, &body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.deposit_with_id(identity, amount, transfer_id).await {
        Ok(id) => (StatusCode::CREATED, Json(dto::transfer_to_json(id))).into_response(),
        Err(e) => errors::banking_error_to_response(e),
    }
}

pub async fn withdraw(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::MovementRequest>,
) -> axum::response::Response {
    let (identity, amount, transfer_id) = match parse_movement(&id, &body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.withdraw_with_id(identity, amount, transfer_id).await {
        Ok(id) => (StatusCode::CREATED, Json(dto::transfer_to_json(id))).into_response(),
        Err(e) => errors::banking_error_to_response(e),
    }
}

fn parse_movement(
    id: &str,
    body: &dto::MovementRequest,
) -> Result<(IdentityId, u64, TransferId), axum::response::Response> {
    let identity = dto::parse_identity_id(id)?;
    let amount = dto::parse_amount(body.amount)?;
    let transfer_id = dto::parse_transfer_id(body.transfer_id)?;
    Ok((identity, amount, transfer_id))
}
