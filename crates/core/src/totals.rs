//! Posted totals and the balance derived from them.

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Cumulative posted debits and credits of a ledger account.
///
/// Both counters are monotonically non-decreasing; the balance is always
/// their difference and is never stored.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedTotals {
    pub debits_posted: u64,
    pub credits_posted: u64,
}

impl PostedTotals {
    pub fn new(debits_posted: u64, credits_posted: u64) -> Self {
        Self {
            debits_posted,
            credits_posted,
        }
    }

    /// `credits_posted - debits_posted`, saturated into `i64`.
    pub fn balance(&self) -> i64 {
        let diff = self.credits_posted as i128 - self.debits_posted as i128;
        diff.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// True when debiting `amount` keeps the balance non-negative.
    pub fn covers(&self, amount: u64) -> bool {
        self.credits_posted
            .checked_sub(self.debits_posted)
            .is_some_and(|available| available >= amount)
    }
}

impl ValueObject for PostedTotals {}
