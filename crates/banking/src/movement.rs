//! Deposits, withdrawals and transfers.
//!
//! | Operation  | Debit account       | Credit account      |
//! |------------|---------------------|---------------------|
//! | deposit    | master credit (`2`) | user                |
//! | withdraw   | user                | master debit (`1`)  |
//! | transfer   | source user         | destination user    |
//!
//! Debits run a pre-flight sufficiency check against posted totals before the
//! transfer is submitted. The check and the submission are two separate engine
//! calls, so the engine's `debits_must_not_exceed_credits` flag on user
//! accounts remains the enforcement point. The check exists to avoid a
//! pointless submission and to report `InsufficientFunds` with context. With
//! `serialize_debits` enabled the check and submission additionally run under
//! a per-account lock.
//!
//! Every submission carries a transfer id. The `*_with_id` forms let a caller
//! whose earlier attempt timed out retry with the same id: the engine then
//! answers `DuplicateSubmission` instead of applying the amount twice. Debits
//! look the id up before the pre-flight check, since an applied debit would
//! otherwise fail that check and be misreported as `InsufficientFunds`.

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument};

use ledgerbank_core::{
    AccountId, Amount, IdentityId, MASTER_CREDIT_ACCOUNT, MASTER_DEBIT_ACCOUNT, TransferId,
};
use ledgerbank_directory::IdentityDirectory;
use ledgerbank_ledger::{LedgerError, LedgerGateway, Transfer, TransferRejection};

use crate::error::{BankingError, validate_amount};
use crate::locks::AccountLocks;

pub struct MoneyMovement<L, D> {
    ledger: L,
    directory: D,
    locks: Option<Arc<AccountLocks>>,
}

impl<L, D> MoneyMovement<L, D>
where
    L: LedgerGateway,
    D: IdentityDirectory,
{
    /// Orchestrator relying solely on engine-side balance enforcement.
    pub fn new(ledger: L, directory: D) -> Self {
        Self {
            ledger,
            directory,
            locks: None,
        }
    }

    /// Orchestrator that also serializes debits per account.
    pub fn with_locks(ledger: L, directory: D, locks: Arc<AccountLocks>) -> Self {
        Self {
            ledger,
            directory,
            locks: Some(locks),
        }
    }

    pub async fn deposit(
        &self,
        identity: IdentityId,
        amount: u64,
    ) -> Result<TransferId, BankingError> {
        self.deposit_with_id(identity, amount, TransferId::generate())
            .await
    }

    #[instrument(
        skip_all,
        fields(identity_id = %identity, amount = amount, transfer_id = %transfer_id),
        err
    )]
    pub async fn deposit_with_id(
        &self,
        identity: IdentityId,
        amount: u64,
        transfer_id: TransferId,
    ) -> Result<TransferId, BankingError> {
        let amount = validate_amount(amount)?;
        let account = self.linked_account(identity).await?;

        self.submit(Transfer::new(
            transfer_id,
            self.ledger.partition(),
            MASTER_CREDIT_ACCOUNT,
            account,
            amount,
        ))
        .await?;

        info!(account_id = %account, amount = %amount, "deposit posted");
        Ok(transfer_id)
    }

    pub async fn withdraw(
        &self,
        identity: IdentityId,
        amount: u64,
    ) -> Result<TransferId, BankingError> {
        self.withdraw_with_id(identity, amount, TransferId::generate())
            .await
    }

    #[instrument(
        skip_all,
        fields(identity_id = %identity, amount = amount, transfer_id = %transfer_id),
        err
    )]
    pub async fn withdraw_with_id(
        &self,
        identity: IdentityId,
        amount: u64,
        transfer_id: TransferId,
    ) -> Result<TransferId, BankingError> {
        let amount = validate_amount(amount)?;
        let account = self.linked_account(identity).await?;

        let _guard = self.serialize(account).await;
        self.ensure_not_submitted(transfer_id).await?;
        self.ensure_sufficient(account, amount).await?;
        self.submit(Transfer::new(
            transfer_id,
            self.ledger.partition(),
            account,
            MASTER_DEBIT_ACCOUNT,
            amount,
        ))
        .await?;

        info!(account_id = %account, amount = %amount, "withdrawal posted");
        Ok(transfer_id)
    }

    pub async fn transfer(
        &self,
        from: IdentityId,
        to: IdentityId,
        amount: u64,
    ) -> Result<TransferId, BankingError> {
        self.transfer_with_id(from, to, amount, TransferId::generate())
            .await
    }

    #[instrument(
        skip_all,
        fields(from = %from, to = %to, amount = amount, transfer_id = %transfer_id),
        err
    )]
    pub async fn transfer_with_id(
        &self,
        from: IdentityId,
        to: IdentityId,
        amount: u64,
        transfer_id: TransferId,
    ) -> Result<TransferId, BankingError> {
        let amount = validate_amount(amount)?;
        if from == to {
            return Err(BankingError::SameAccount);
        }

        let source = self.linked_account(from).await?;
        let destination = self.linked_account(to).await?;
        if source == destination {
            return Err(BankingError::SameAccount);
        }

        let _guard = self.serialize(source).await;
        self.ensure_not_submitted(transfer_id).await?;
        self.ensure_sufficient(source, amount).await?;
        self.submit(Transfer::new(
            transfer_id,
            self.ledger.partition(),
            source,
            destination,
            amount,
        ))
        .await?;

        info!(
            source = %source,
            destination = %destination,
            amount = %amount,
            "transfer posted"
        );
        Ok(transfer_id)
    }

    async fn linked_account(&self, identity: IdentityId) -> Result<AccountId, BankingError> {
        let record = self.directory.get_identity(identity).await?;
        record
            .ledger_account_id
            .ok_or(BankingError::AccountNotLinked(identity))
    }

    async fn serialize(&self, account: AccountId) -> Option<OwnedMutexGuard<()>> {
        match &self.locks {
            Some(locks) => Some(locks.lock(account).await),
            None => None,
        }
    }

    async fn ensure_not_submitted(&self, transfer_id: TransferId) -> Result<(), BankingError> {
        if self.ledger.lookup_transfer(transfer_id).await?.is_some() {
            debug!(transfer_id = %transfer_id, "transfer id already accepted");
            return Err(BankingError::DuplicateSubmission(transfer_id));
        }
        Ok(())
    }

    async fn ensure_sufficient(&self, account: AccountId, amount: Amount) -> Result<(), BankingError> {
        let totals = self.ledger.posted_totals(account).await?;
        if !totals.covers(amount.get()) {
            debug!(
                account_id = %account,
                balance = totals.balance(),
                requested = amount.get(),
                "pre-flight sufficiency check failed"
            );
            return Err(BankingError::InsufficientFunds {
                account_id: account,
                requested: amount.get(),
            });
        }
        Ok(())
    }

    async fn submit(&self, transfer: Transfer) -> Result<(), BankingError> {
        let requested = transfer.amount.get();
        self.ledger
            .create_transfer(transfer)
            .await
            .map_err(|e| match e {
                LedgerError::Rejected(TransferRejection::ExceedsCredits(account_id)) => {
                    BankingError::InsufficientFunds {
                        account_id,
                        requested,
                    }
                }
                other => other.into(),
            })
    }
}
