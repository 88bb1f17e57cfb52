//! Strongly-typed identifiers.
//!
//! Identities are 128-bit UUIDs owned by the directory. Accounts and transfers
//! use the ledger engine's native 64-bit unsigned identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a bank customer (directory record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
    /// Create a new identifier (UUIDv4, random).
    ///
    /// Random rather than time-ordered: the leading bytes feed account id
    /// derivation and must not cluster by creation time.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for IdentityId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<IdentityId> for Uuid {
    fn from(value: IdentityId) -> Self {
        value.0
    }
}

impl FromStr for IdentityId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("IdentityId: {e}")))?;
        Ok(Self(uuid))
    }
}

macro_rules! impl_u64_newtype {
    ($t:ident, $name:literal) => {
        impl $t {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $t {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for u64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .parse::<u64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(raw))
            }
        }
    };
}

/// Ledger-native account identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u64);

/// Ledger-native transfer identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(u64);

impl_u64_newtype!(AccountId, "AccountId");
impl_u64_newtype!(TransferId, "TransferId");

/// Sink for withdrawals.
pub const MASTER_DEBIT_ACCOUNT: AccountId = AccountId::new(1);

/// Source for deposits.
pub const MASTER_CREDIT_ACCOUNT: AccountId = AccountId::new(2);

impl AccountId {
    /// True for the two system-wide clearing accounts (and the unused id `0`).
    pub fn is_reserved(self) -> bool {
        self.0 <= MASTER_CREDIT_ACCOUNT.0
    }
}

impl TransferId {
    /// Engines reserve `0`; it is never a valid transfer id.
    pub fn is_reserved(self) -> bool {
        self.0 == 0
    }
}
