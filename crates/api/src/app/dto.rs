use serde::Deserialize;

use ledgerbank_core::{Amount, IdentityId, TransferId};
use ledgerbank_directory::{Identity, NewIdentity};
use ledgerbank_ledger::LedgerAccount;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterIdentityRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<RegisterIdentityRequest> for NewIdentity {
    fn from(body: RegisterIdentityRequest) -> Self {
        NewIdentity {
            email: body.email.trim().to_string(),
            first_name: body.first_name,
            last_name: body.last_name,
        }
    }
}

/// Body of deposit and withdraw requests.
#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    /// Signed so that negative input is reported as `invalid_amount` rather
    /// than as a JSON shape error.
    pub amount: i64,
    /// Reuse the id of a timed-out attempt to make the retry safe.
    pub transfer_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub transfer_id: Option<u64>,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_identity_id(raw: &str) -> Result<IdentityId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("not an identity id: {raw}"),
        )
    })
}

/// Reject zero and negative amounts before they reach the service.
pub fn parse_amount(raw: i64) -> Result<u64, axum::response::Response> {
    Amount::from_signed(raw).map(Amount::get).map_err(|e| {
        errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_amount",
            e.to_string(),
        )
    })
}

/// Caller-supplied transfer id, or a fresh one. `0` is reserved by the engine.
pub fn parse_transfer_id(raw: Option<u64>) -> Result<TransferId, axum::response::Response> {
    match raw.map(TransferId::new) {
        Some(id) if id.is_reserved() => Err(errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_id",
            "transfer_id 0 is reserved",
        )),
        Some(id) => Ok(id),
        None => Ok(TransferId::generate()),
    }
}

pub fn validate_registration(body: &RegisterIdentityRequest) -> Result<(), axum::response::Response> {
    let email = body.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "validation_error",
            "email must be a valid address",
        ));
    }
    Ok(())
}

// -------------------------
// Response mapping
// -------------------------

pub fn identity_to_json(identity: &Identity) -> serde_json::Value {
    serde_json::json!({
        "id": identity.id.to_string(),
        "email": identity.email,
        "first_name": identity.first_name,
        "last_name": identity.last_name,
        "ledger_account_id": identity.ledger_account_id.map(|a| a.get()),
        "is_active": identity.is_active,
        "created_at": identity.created_at,
        "updated_at": identity.updated_at,
    })
}

pub fn account_to_json(account: &LedgerAccount) -> serde_json::Value {
    serde_json::json!({
        "id": account.id.get(),
        "ledger": account.ledger,
        "category": account.category,
        "debits_posted": account.debits_posted,
        "credits_posted": account.credits_posted,
        "balance": account.balance(),
    })
}

pub fn transfer_to_json(transfer_id: TransferId) -> serde_json::Value {
    serde_json::json!({ "transfer_id": transfer_id.get() })
}
