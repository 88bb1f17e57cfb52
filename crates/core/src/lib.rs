//! `ledgerbank-core`: identifiers and money primitives shared by every crate.
//!
//! This crate contains **pure** primitives (no IO, no async, no engine concerns).

pub mod amount;
pub mod derive;
pub mod error;
pub mod id;
pub mod totals;
pub mod value_object;

pub use amount::Amount;
pub use derive::{RESERVED_OFFSET, account_id_for, transfer_id_from};
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, IdentityId, MASTER_CREDIT_ACCOUNT, MASTER_DEBIT_ACCOUNT, TransferId};
pub use totals::PostedTotals;
pub use value_object::ValueObject;
