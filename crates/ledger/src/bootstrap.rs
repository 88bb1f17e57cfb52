//! Master account bootstrap.
//!
//! Accounts `1` (master debit) and `2` (master credit) must exist before any
//! customer operation runs. Creation is idempotent: `AccountExists` counts as
//! success. Any other failure is logged and reported but never aborts startup,
//! since previously created accounts already satisfy the invariant.

use tracing::{info, warn};

use ledgerbank_core::{AccountId, MASTER_CREDIT_ACCOUNT, MASTER_DEBIT_ACCOUNT};

use crate::account::AccountCategory;
use crate::gateway::{LedgerError, LedgerGateway};

/// Result of ensuring a single master account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterOutcome {
    Created,
    AlreadyExisted,
    Failed(LedgerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub outcomes: Vec<(AccountId, MasterOutcome)>,
}

impl BootstrapReport {
    /// True if at least one master account could not be confirmed.
    pub fn is_degraded(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, outcome)| matches!(outcome, MasterOutcome::Failed(_)))
    }
}

const MASTER_ACCOUNTS: [(AccountId, AccountCategory); 2] = [
    (MASTER_DEBIT_ACCOUNT, AccountCategory::MasterDebit),
    (MASTER_CREDIT_ACCOUNT, AccountCategory::MasterCredit),
];

/// Idempotently create both master accounts.
pub async fn ensure_master_accounts<G>(gateway: &G) -> BootstrapReport
where
    G: LedgerGateway + ?Sized,
{
    let mut outcomes = Vec::with_capacity(MASTER_ACCOUNTS.len());

    for (id, category) in MASTER_ACCOUNTS {
        let outcome = match gateway.create_account(id, category).await {
            Ok(_) => MasterOutcome::Created,
            Err(LedgerError::AccountExists(_)) => MasterOutcome::AlreadyExisted,
            Err(e) => {
                warn!(account_id = %id, error = %e, "master account bootstrap failed");
                MasterOutcome::Failed(e)
            }
        };
        outcomes.push((id, outcome));
    }

    let report = BootstrapReport { outcomes };
    if report.is_degraded() {
        warn!("master accounts initialized with warnings");
    } else {
        info!("master accounts initialized");
    }
    report
}
