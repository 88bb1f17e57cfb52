use serde::{Deserialize, Serialize};

use ledgerbank_core::{AccountId, PostedTotals};

/// Category code stamped on every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    /// Sink for withdrawals (account `1`).
    MasterDebit,
    /// Source for deposits (account `2`).
    MasterCredit,
    /// One per customer identity.
    User,
}

impl AccountCategory {
    pub fn code(self) -> u16 {
        match self {
            AccountCategory::MasterDebit => 1,
            AccountCategory::MasterCredit => 2,
            AccountCategory::User => 100,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(AccountCategory::MasterDebit),
            2 => Some(AccountCategory::MasterCredit),
            100 => Some(AccountCategory::User),
            _ => None,
        }
    }

    /// Engine-side constraints applied when an account of this category is created.
    ///
    /// User accounts may never go negative; the master accounts are the
    /// counterparties of every deposit and withdrawal and carry no limit.
    pub fn default_flags(self) -> AccountFlags {
        match self {
            AccountCategory::User => AccountFlags {
                debits_must_not_exceed_credits: true,
            },
            AccountCategory::MasterDebit | AccountCategory::MasterCredit => AccountFlags::default(),
        }
    }
}

/// Account-level constraints enforced by the engine on every transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFlags {
    pub debits_must_not_exceed_credits: bool,
}

/// Engine-owned account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub id: AccountId,
    /// Ledger partition; transfers only move value within one partition.
    pub ledger: u32,
    pub category: AccountCategory,
    pub flags: AccountFlags,
    pub debits_posted: u64,
    pub credits_posted: u64,
}

impl LedgerAccount {
    pub fn new(id: AccountId, ledger: u32, category: AccountCategory) -> Self {
        Self {
            id,
            ledger,
            category,
            flags: category.default_flags(),
            debits_posted: 0,
            credits_posted: 0,
        }
    }

    pub fn totals(&self) -> PostedTotals {
        PostedTotals::new(self.debits_posted, self.credits_posted)
    }

    pub fn balance(&self) -> i64 {
        self.totals().balance()
    }
}
