use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerbank_core::{AccountId, IdentityId};

/// Fields supplied when registering a new identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIdentity {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Directory record for a bank customer.
///
/// `ledger_account_id` is written once by the account provisioner and is never
/// re-linked afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub ledger_account_id: Option<AccountId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn from_new(id: IdentityId, fields: NewIdentity, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: fields.email,
            first_name: fields.first_name,
            last_name: fields.last_name,
            ledger_account_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.ledger_account_id.is_some()
    }
}
