use thiserror::Error;

use ledgerbank_core::{AccountId, Amount, IdentityId, TransferId};
use ledgerbank_directory::DirectoryError;
use ledgerbank_ledger::LedgerError;

/// Errors surfaced to the HTTP layer.
///
/// None of these panic or terminate the process; each is a typed result the
/// caller can map to a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankingError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("identity {0} has no ledger account")]
    AccountNotLinked(IdentityId),

    #[error("insufficient funds on account {account_id}: requested {requested}")]
    InsufficientFunds { account_id: AccountId, requested: u64 },

    #[error("source and destination are the same account")]
    SameAccount,

    /// The engine could not be reached; a mutation may or may not have landed.
    #[error("ledger engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine already holds a transfer with this id; the amount was not
    /// applied again by this request.
    #[error("transfer {0} was already submitted")]
    DuplicateSubmission(TransferId),

    /// The ledger account exists but the directory does not point at it yet.
    /// Recover by re-running the link step (`associate`), never by recreating
    /// the account.
    #[error(
        "ledger account {account_id} created for identity {identity} but linking failed: {reason}"
    )]
    ProvisionPartialFailure {
        identity: IdentityId,
        account_id: AccountId,
        reason: String,
    },

    #[error("identity {0} not found")]
    IdentityNotFound(IdentityId),

    #[error("identity {identity} is already linked to account {existing}")]
    AlreadyLinked {
        identity: IdentityId,
        existing: AccountId,
    },

    /// The derived account id is held by an account this identity cannot adopt.
    #[error("derived account id {account_id} for identity {identity} is already taken")]
    AccountCollision {
        identity: IdentityId,
        account_id: AccountId,
    },

    #[error("ledger rejected the request: {0}")]
    LedgerRejected(String),

    #[error(transparent)]
    Directory(DirectoryError),
}

impl From<DirectoryError> for BankingError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::NotFound(id) => BankingError::IdentityNotFound(id),
            DirectoryError::AlreadyLinked { identity, existing } => {
                BankingError::AlreadyLinked { identity, existing }
            }
            other => BankingError::Directory(other),
        }
    }
}

impl From<LedgerError> for BankingError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Unavailable(msg) => BankingError::EngineUnavailable(msg),
            LedgerError::TransferExists(id) => BankingError::DuplicateSubmission(id),
            other => BankingError::LedgerRejected(other.to_string()),
        }
    }
}

/// Re-validate an amount at the core boundary.
pub(crate) fn validate_amount(minor_units: u64) -> Result<Amount, BankingError> {
    Amount::new(minor_units).map_err(|e| BankingError::InvalidAmount(e.to_string()))
}
