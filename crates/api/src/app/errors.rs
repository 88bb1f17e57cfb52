use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use ledgerbank_banking::BankingError;
use ledgerbank_directory::DirectoryError;

pub fn banking_error_to_response(err: BankingError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        BankingError::InvalidAmount(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_amount", message)
        }
        BankingError::SameAccount => json_error(StatusCode::BAD_REQUEST, "same_account", message),
        BankingError::IdentityNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "identity_not_found", message)
        }
        BankingError::AccountNotLinked(_) => {
            json_error(StatusCode::CONFLICT, "account_not_linked", message)
        }
        BankingError::AlreadyLinked { .. } => {
            json_error(StatusCode::CONFLICT, "already_linked", message)
        }
        BankingError::AccountCollision { .. } => {
            json_error(StatusCode::CONFLICT, "account_collision", message)
        }
        BankingError::DuplicateSubmission(_) => {
            json_error(StatusCode::CONFLICT, "duplicate_submission", message)
        }
        BankingError::InsufficientFunds { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_funds", message)
        }
        BankingError::LedgerRejected(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "ledger_rejected", message)
        }
        BankingError::EngineUnavailable(_) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "engine_unavailable", message)
        }
        BankingError::ProvisionPartialFailure { .. } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "provision_partial_failure",
            message,
        ),
        BankingError::Directory(DirectoryError::DuplicateEmail(_)) => {
            json_error(StatusCode::CONFLICT, "duplicate_email", message)
        }
        BankingError::Directory(DirectoryError::Storage(_)) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "directory_unavailable", message)
        }
        BankingError::Directory(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "directory_error", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
