use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use ledgerbank_core::{AccountId, PostedTotals, TransferId};

use crate::account::{AccountCategory, LedgerAccount};
use crate::gateway::{LedgerError, LedgerGateway, TransferRejection};
use crate::posting::plan_posting;
use crate::transfer::Transfer;

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<AccountId, LedgerAccount>,
    transfers: HashMap<TransferId, Transfer>,
}

/// Fault switches for exercising partial-failure paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerFaults {
    /// Every call fails with [`LedgerError::Unavailable`].
    pub unavailable: bool,
    /// `create_account` fails with [`LedgerError::Unavailable`]; other calls succeed.
    pub fail_account_creation: bool,
}

/// In-process double-entry engine.
///
/// Intended for tests/dev. Applies each transfer atomically under a single
/// write lock, enforces transfer-id uniqueness and the
/// `debits_must_not_exceed_credits` account flag.
#[derive(Debug)]
pub struct InMemoryLedger {
    partition: u32,
    state: RwLock<LedgerState>,
    faults: RwLock<LedgerFaults>,
}

impl InMemoryLedger {
    pub fn new(partition: u32) -> Self {
        Self {
            partition,
            state: RwLock::new(LedgerState::default()),
            faults: RwLock::new(LedgerFaults::default()),
        }
    }

    pub fn set_faults(&self, faults: LedgerFaults) {
        if let Ok(mut current) = self.faults.write() {
            *current = faults;
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut current) = self.faults.write() {
            current.unavailable = unavailable;
        }
    }

    pub fn set_fail_account_creation(&self, fail: bool) {
        if let Ok(mut current) = self.faults.write() {
            current.fail_account_creation = fail;
        }
    }

    pub fn transfer_count(&self) -> usize {
        self.state.read().map(|s| s.transfers.len()).unwrap_or(0)
    }

    fn faults(&self) -> LedgerFaults {
        self.faults.read().map(|f| *f).unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.faults().unavailable {
            return Err(LedgerError::Unavailable("engine unreachable".to_string()));
        }
        Ok(())
    }

    fn poisoned() -> LedgerError {
        LedgerError::Unavailable("lock poisoned".to_string())
    }

    fn apply_transfer(&self, state: &mut LedgerState, transfer: Transfer) -> Result<(), LedgerError> {
        if state.transfers.contains_key(&transfer.id) {
            return Err(LedgerError::TransferExists(transfer.id));
        }
        if transfer.debit_account_id == transfer.credit_account_id {
            return Err(LedgerError::Rejected(TransferRejection::SameAccount));
        }

        let debit = state
            .accounts
            .get(&transfer.debit_account_id)
            .ok_or(LedgerError::AccountNotFound(transfer.debit_account_id))?;
        let credit = state
            .accounts
            .get(&transfer.credit_account_id)
            .ok_or(LedgerError::AccountNotFound(transfer.credit_account_id))?;

        let posting = plan_posting(&transfer, debit, credit, u64::MAX)?;

        // All checks passed; both postings land under the same write lock.
        if let Some(debit) = state.accounts.get_mut(&transfer.debit_account_id) {
            debit.debits_posted = posting.debits_posted;
        }
        if let Some(credit) = state.accounts.get_mut(&transfer.credit_account_id) {
            credit.credits_posted = posting.credits_posted;
        }
        state.transfers.insert(transfer.id, transfer);
        Ok(())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    fn partition(&self) -> u32 {
        self.partition
    }

    async fn create_account(
        &self,
        id: AccountId,
        category: AccountCategory,
    ) -> Result<LedgerAccount, LedgerError> {
        self.check_available()?;
        if self.faults().fail_account_creation {
            return Err(LedgerError::Unavailable(
                "account creation failed".to_string(),
            ));
        }

        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        if state.accounts.contains_key(&id) {
            return Err(LedgerError::AccountExists(id));
        }

        let account = LedgerAccount::new(id, self.partition, category);
        state.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<LedgerAccount, LedgerError> {
        self.check_available()?;
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        state
            .accounts
            .get(&id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn create_transfer(&self, transfer: Transfer) -> Result<(), LedgerError> {
        self.check_available()?;
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        self.apply_transfer(&mut state, transfer)
    }

    async fn lookup_transfer(&self, id: TransferId) -> Result<Option<Transfer>, LedgerError> {
        self.check_available()?;
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.transfers.get(&id).cloned())
    }

    async fn posted_totals(&self, id: AccountId) -> Result<PostedTotals, LedgerError> {
        self.get_account(id).await.map(|account| account.totals())
    }
}
