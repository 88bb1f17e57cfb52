//! Identity directory boundary.
//!
//! The directory owns customer identity records. The banking core consumes four
//! operations (create, read, set ledger link, delete) through
//! [`IdentityDirectory`]; everything else about identities lives elsewhere.

pub mod identity;
pub mod memory;
pub mod postgres;
pub mod store;

pub use identity::{Identity, NewIdentity};
pub use memory::{DirectoryFaults, InMemoryDirectory};
pub use postgres::PostgresDirectory;
pub use store::{DirectoryError, IdentityDirectory};
