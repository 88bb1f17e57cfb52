use serde::{Deserialize, Serialize};

use ledgerbank_core::{AccountId, Amount, TransferId};

/// Transfer code used for every customer money movement.
pub const TRANSFER_CODE_STANDARD: u16 = 1;

/// Immutable movement of `amount` from `debit_account_id` to `credit_account_id`.
///
/// Created once at submission time; the engine never mutates or deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    /// Ledger partition; must match both accounts.
    pub ledger: u32,
    pub debit_account_id: AccountId,
    pub credit_account_id: AccountId,
    pub amount: Amount,
    pub code: u16,
}

impl Transfer {
    pub fn new(
        id: TransferId,
        ledger: u32,
        debit_account_id: AccountId,
        credit_account_id: AccountId,
        amount: Amount,
    ) -> Self {
        Self {
            id,
            ledger,
            debit_account_id,
            credit_account_id,
            amount,
            code: TRANSFER_CODE_STANDARD,
        }
    }
}
