//! Facade exposing the five customer operations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ledgerbank_core::{AccountId, IdentityId, TransferId};
use ledgerbank_directory::{Identity, IdentityDirectory, NewIdentity};
use ledgerbank_ledger::{BootstrapReport, LedgerAccount, LedgerGateway, ensure_master_accounts};

use crate::balance::BalanceReader;
use crate::error::BankingError;
use crate::locks::AccountLocks;
use crate::movement::MoneyMovement;
use crate::provisioner::AccountProvisioner;

/// Orchestration options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankingOptions {
    /// Serialize read-check-submit per debited account. Required when the
    /// engine does not enforce non-negative balances itself.
    pub serialize_debits: bool,
}

/// Entry point used by the HTTP layer.
///
/// Only obtainable through [`BankingService::start`], which runs the master
/// account bootstrap first, so no operation can be served before both clearing
/// accounts have been ensured.
pub struct BankingService<L, D> {
    provisioner: AccountProvisioner<L, D>,
    movement: MoneyMovement<L, D>,
    balances: BalanceReader<L, D>,
    bootstrap: BootstrapReport,
}

impl<L, D> BankingService<L, D>
where
    L: LedgerGateway + Clone,
    D: IdentityDirectory + Clone,
{
    pub async fn start(ledger: L, directory: D, options: BankingOptions) -> Self {
        let bootstrap = ensure_master_accounts(&ledger).await;

        let movement = if options.serialize_debits {
            MoneyMovement::with_locks(
                ledger.clone(),
                directory.clone(),
                Arc::new(AccountLocks::new()),
            )
        } else {
            MoneyMovement::new(ledger.clone(), directory.clone())
        };

        Self {
            provisioner: AccountProvisioner::new(ledger.clone(), directory.clone()),
            movement,
            balances: BalanceReader::new(ledger, directory),
            bootstrap,
        }
    }

    pub fn bootstrap_report(&self) -> &BootstrapReport {
        &self.bootstrap
    }

    pub async fn register(&self, request: NewIdentity) -> Result<Identity, BankingError> {
        self.provisioner.register(request).await
    }

    pub async fn provision(&self, identity: IdentityId) -> Result<AccountId, BankingError> {
        self.provisioner.provision(identity).await
    }

    pub async fn associate(&self, identity: IdentityId) -> Result<AccountId, BankingError> {
        self.provisioner.associate(identity).await
    }

    pub async fn deposit(
        &self,
        identity: IdentityId,
        amount: u64,
    ) -> Result<TransferId, BankingError> {
        self.movement.deposit(identity, amount).await
    }

    pub async fn deposit_with_id(
        &self,
        identity: IdentityId,
        amount: u64,
        transfer_id: TransferId,
    ) -> Result<TransferId, BankingError> {
        self.movement
            .deposit_with_id(identity, amount, transfer_id)
            .await
    }

    pub async fn withdraw(
        &self,
        identity: IdentityId,
        amount: u64,
    ) -> Result<TransferId, BankingError> {
        self.movement.withdraw(identity, amount).await
    }

    pub async fn withdraw_with_id(
        &self,
        identity: IdentityId,
        amount: u64,
        transfer_id: TransferId,
    ) -> Result<TransferId, BankingError> {
        self.movement
            .withdraw_with_id(identity, amount, transfer_id)
            .await
    }

    pub async fn transfer(
        &self,
        from: IdentityId,
        to: IdentityId,
        amount: u64,
    ) -> Result<TransferId, BankingError> {
        self.movement.transfer(from, to, amount).await
    }

    pub async fn transfer_with_id(
        &self,
        from: IdentityId,
        to: IdentityId,
        amount: u64,
        transfer_id: TransferId,
    ) -> Result<TransferId, BankingError> {
        self.movement
            .transfer_with_id(from, to, amount, transfer_id)
            .await
    }

    pub async fn balance(&self, identity: IdentityId) -> Result<i64, BankingError> {
        self.balances.balance(identity).await
    }

    pub async fn account(&self, identity: IdentityId) -> Result<LedgerAccount, BankingError> {
        self.balances.account(identity).await
    }
}
