//! Per-account serialization for engines without balance enforcement.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use ledgerbank_core::AccountId;

/// Idle entries are pruned once the table grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// Keyed async mutex: one lock per debited account.
///
/// Held around the read-check-submit sequence so two debits against the same
/// account cannot both pass the sufficiency check on a stale balance.
#[derive(Debug, Default)]
pub struct AccountLocks {
    slots: Mutex<HashMap<AccountId, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, account: AccountId) -> OwnedMutexGuard<()> {
        let slot = {
            // The table holds no invariant a panicking holder could break.
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.len() > PRUNE_THRESHOLD {
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            slots.entry(account).or_default().clone()
        };
        slot.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_account_is_exclusive() {
        let locks = Arc::new(AccountLocks::new());
        let account = AccountId::new(10);

        let guard = locks.lock(account).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(account).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_accounts_do_not_block() {
        let locks = AccountLocks::new();
        let _a = locks.lock(AccountId::new(1)).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(AccountId::new(2))).await;
        assert!(b.is_ok());
        assert_eq!(locks.tracked(), 2);
    }
}
