//! Ledger orchestration core.
//!
//! Keeps two independently failing systems consistent: the identity directory
//! (who a customer is) and the double-entry ledger engine (what they hold).
//!
//! - `provisioner`: create a customer's ledger account and link it, with a
//!   compensating delete when the ledger step fails
//! - `movement`: deposits, withdrawals and transfers as engine transfers
//!   against the master clearing accounts or another customer
//! - `balance`: balance reads derived from posted totals
//! - `service`: facade that can only be built once the master accounts exist
//!
//! The core is stateless between calls apart from its gateway handles and the
//! optional per-account lock table.

pub mod balance;
pub mod error;
pub mod locks;
pub mod movement;
pub mod provisioner;
pub mod service;

pub use balance::BalanceReader;
pub use error::BankingError;
pub use locks::AccountLocks;
pub use movement::MoneyMovement;
pub use provisioner::AccountProvisioner;
pub use service::{BankingOptions, BankingService};
