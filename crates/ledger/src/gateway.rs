//! The contract between the orchestration core and the ledger engine.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use ledgerbank_core::{AccountId, PostedTotals, TransferId};

use crate::account::{AccountCategory, LedgerAccount};
use crate::transfer::Transfer;

/// Why the engine refused a well-formed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransferRejection {
    /// The debit account is flagged and would end up with debits above credits.
    #[error("debits would exceed credits on account {0}")]
    ExceedsCredits(AccountId),

    #[error("debit and credit accounts are the same")]
    SameAccount,

    /// The transfer and its accounts are not all on the same ledger partition.
    #[error("transfer and accounts belong to different ledgers")]
    LedgerMismatch,

    #[error("posted totals would overflow")]
    Overflow,
}

/// Ledger gateway error.
///
/// `AccountExists` and `TransferExists` are distinguishable outcomes rather
/// than plain failures: for accounts they make bootstrap idempotent, for
/// transfers they are the engine's idempotency signal (the amount was **not**
/// applied a second time).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("account {0} already exists")]
    AccountExists(AccountId),

    #[error("transfer {0} already exists")]
    TransferExists(TransferId),

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("transfer rejected: {0}")]
    Rejected(TransferRejection),

    /// Transport / availability failure; the outcome of a mutation is unknown.
    #[error("ledger engine unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountExists(_) | LedgerError::TransferExists(_)
        )
    }
}

/// Narrow, capability-typed interface to the external ledger engine.
///
/// Every call is a single-shot request that may be slow and may fail
/// independently of the identity directory. Implementations must be safe for
/// concurrent use by many in-flight requests.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Ledger partition stamped on every account this gateway creates. Transfers
    /// submitted through it must carry the same value.
    fn partition(&self) -> u32;

    /// Create an account in the gateway's ledger partition.
    ///
    /// Fails with [`LedgerError::AccountExists`] if the id is taken.
    async fn create_account(
        &self,
        id: AccountId,
        category: AccountCategory,
    ) -> Result<LedgerAccount, LedgerError>;

    async fn get_account(&self, id: AccountId) -> Result<LedgerAccount, LedgerError>;

    /// Submit a transfer.
    ///
    /// Fails with [`LedgerError::TransferExists`] if the id was previously
    /// accepted, [`LedgerError::AccountNotFound`] if either side is unknown and
    /// [`LedgerError::Rejected`] when the engine's own rules refuse it.
    async fn create_transfer(&self, transfer: Transfer) -> Result<(), LedgerError>;

    /// Previously accepted transfer with this id, if any.
    async fn lookup_transfer(&self, id: TransferId) -> Result<Option<Transfer>, LedgerError>;

    async fn posted_totals(&self, id: AccountId) -> Result<PostedTotals, LedgerError> {
        self.get_account(id).await.map(|account| account.totals())
    }
}

#[async_trait]
impl<G> LedgerGateway for Arc<G>
where
    G: LedgerGateway + ?Sized,
{
    fn partition(&self) -> u32 {
        (**self).partition()
    }

    async fn create_account(
        &self,
        id: AccountId,
        category: AccountCategory,
    ) -> Result<LedgerAccount, LedgerError> {
        (**self).create_account(id, category).await
    }

    async fn get_account(&self, id: AccountId) -> Result<LedgerAccount, LedgerError> {
        (**self).get_account(id).await
    }

    async fn create_transfer(&self, transfer: Transfer) -> Result<(), LedgerError> {
        (**self).create_transfer(transfer).await
    }

    async fn lookup_transfer(&self, id: TransferId) -> Result<Option<Transfer>, LedgerError> {
        (**self).lookup_transfer(id).await
    }

    async fn posted_totals(&self, id: AccountId) -> Result<PostedTotals, LedgerError> {
        (**self).posted_totals(id).await
    }
}
