use tracing::warn;

use ledgerbank_core::IdentityId;
use ledgerbank_directory::IdentityDirectory;
use ledgerbank_ledger::{LedgerAccount, LedgerGateway};

use crate::error::BankingError;

/// Balance reads derived from posted totals.
///
/// Balance display must not block on ledger availability: an engine read
/// failure is logged and reported as a zero balance. Nothing is mutated on
/// this path, so the degraded answer loses no data.
pub struct BalanceReader<L, D> {
    ledger: L,
    directory: D,
}

impl<L, D> BalanceReader<L, D>
where
    L: LedgerGateway,
    D: IdentityDirectory,
{
    pub fn new(ledger: L, directory: D) -> Self {
        Self { ledger, directory }
    }

    /// `credits_posted - debits_posted` of the identity's account, or `0` if it
    /// has no account yet.
    pub async fn balance(&self, identity: IdentityId) -> Result<i64, BankingError> {
        let record = self.directory.get_identity(identity).await?;
        let Some(account_id) = record.ledger_account_id else {
            return Ok(0);
        };

        match self.ledger.posted_totals(account_id).await {
            Ok(totals) => Ok(totals.balance()),
            Err(e) => {
                warn!(
                    identity_id = %identity,
                    account_id = %account_id,
                    error = %e,
                    "balance read failed; reporting zero"
                );
                Ok(0)
            }
        }
    }

    /// Raw ledger account behind an identity. Engine failures propagate.
    pub async fn account(&self, identity: IdentityId) -> Result<LedgerAccount, BankingError> {
        let record = self.directory.get_identity(identity).await?;
        let account_id = record
            .ledger_account_id
            .ok_or(BankingError::AccountNotLinked(identity))?;
        Ok(self.ledger.get_account(account_id).await?)
    }
}
