//! Deterministic mapping from 128-bit identifiers to ledger-native ids.
//!
//! Both mappings keep the most-significant 8 bytes of the UUID, read as a
//! big-endian `u64`. Account ids are pure functions of the identity, so
//! re-deriving always lands on the same ledger account and no mapping table
//! is needed.
//!
//! The truncation is **not** collision resistant: two distinct identities can
//! share their leading 8 bytes and therefore map to the same account id. The
//! engine rejects the second account creation with `AlreadyExists`. The
//! provisioner resumes only an untouched user account at that id and surfaces
//! anything else as a collision.

use uuid::Uuid;

use crate::id::{AccountId, IdentityId, TransferId};

/// Added to derived account ids that fall into the reserved range (`0..=2`).
pub const RESERVED_OFFSET: u64 = 1000;

fn leading_u64(uuid: &Uuid) -> u64 {
    let (high, _low) = uuid.as_u64_pair();
    high
}

/// Ledger account id for an identity.
pub fn account_id_for(identity: IdentityId) -> AccountId {
    let raw = leading_u64(identity.as_uuid());
    let id = AccountId::new(raw);
    if id.is_reserved() {
        AccountId::new(raw + RESERVED_OFFSET)
    } else {
        id
    }
}

/// Transfer id from a freshly generated 128-bit value.
///
/// Transfer ids share no reserved range, so no offset is applied.
pub fn transfer_id_from(uuid: Uuid) -> TransferId {
    TransferId::new(leading_u64(&uuid))
}

impl TransferId {
    /// Fresh transfer id for a new logical operation.
    ///
    /// Uses UUIDv4: the leading 8 bytes of a v7 UUID are mostly timestamp and
    /// would collide for operations issued in the same millisecond. Never
    /// returns the reserved id `0`.
    pub fn generate() -> Self {
        loop {
            let id = transfer_id_from(Uuid::new_v4());
            if !id.is_reserved() {
                return id;
            }
        }
    }
}
