//! Posting rules shared by every engine implementation.
//!
//! Engines look up both accounts, call [`plan_posting`], and apply the
//! returned totals atomically. Duplicate-id, same-account and
//! unknown-account checks happen before this point because they depend on
//! how each engine stores its records.

use crate::account::LedgerAccount;
use crate::gateway::{LedgerError, TransferRejection};
use crate::transfer::Transfer;

/// New posted totals for the two sides of an accepted transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// `debits_posted` of the debit account after the transfer.
    pub debits_posted: u64,
    /// `credits_posted` of the credit account after the transfer.
    pub credits_posted: u64,
}

/// Validate `transfer` against both accounts and compute the new totals.
///
/// `ceiling` is the largest total the engine can store; exceeding it is an
/// [`TransferRejection::Overflow`].
pub fn plan_posting(
    transfer: &Transfer,
    debit: &LedgerAccount,
    credit: &LedgerAccount,
    ceiling: u64,
) -> Result<Posting, LedgerError> {
    if debit.ledger != transfer.ledger || credit.ledger != transfer.ledger {
        return Err(LedgerError::Rejected(TransferRejection::LedgerMismatch));
    }

    let amount = transfer.amount.get();
    let overflow = LedgerError::Rejected(TransferRejection::Overflow);
    let debits_posted = debit
        .debits_posted
        .checked_add(amount)
        .filter(|total| *total <= ceiling)
        .ok_or_else(|| overflow.clone())?;
    let credits_posted = credit
        .credits_posted
        .checked_add(amount)
        .filter(|total| *total <= ceiling)
        .ok_or(overflow)?;

    if debit.flags.debits_must_not_exceed_credits && debits_posted > debit.credits_posted {
        return Err(LedgerError::Rejected(TransferRejection::ExceedsCredits(
            debit.id,
        )));
    }

    Ok(Posting {
        debits_posted,
        credits_posted,
    })
}
