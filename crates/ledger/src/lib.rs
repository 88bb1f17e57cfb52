//! Ledger engine boundary.
//!
//! - `gateway`: the narrow async contract the orchestration core is written against
//! - `memory`: an in-process engine implementing that contract (tests/dev)
//! - `postgres`: a durable engine over Postgres row locks
//! - `posting`: validation and total arithmetic every engine shares
//! - `bootstrap`: idempotent creation of the two master clearing accounts
//!
//! The engine owns accounts and transfers; callers only ever hold identifiers.

pub mod account;
pub mod bootstrap;
pub mod gateway;
pub mod memory;
pub mod postgres;
pub mod posting;
pub mod transfer;

pub use account::{AccountCategory, AccountFlags, LedgerAccount};
pub use bootstrap::{BootstrapReport, MasterOutcome, ensure_master_accounts};
pub use gateway::{LedgerError, LedgerGateway, TransferRejection};
pub use memory::{InMemoryLedger, LedgerFaults};
pub use postgres::PostgresLedger;
pub use posting::{Posting, plan_posting};
pub use transfer::{TRANSFER_CODE_STANDARD, Transfer};
