use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use ledgerbank_core::{AccountId, IdentityId};

use crate::identity::{Identity, NewIdentity};
use crate::store::{DirectoryError, IdentityDirectory};

/// Fault switches for exercising partial-failure paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryFaults {
    /// `set_ledger_link` fails with [`DirectoryError::Storage`].
    pub fail_link_writes: bool,
    /// `delete_identity` fails with [`DirectoryError::Storage`].
    pub fail_deletes: bool,
}

/// In-memory identity directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    identities: RwLock<HashMap<IdentityId, Identity>>,
    faults: RwLock<DirectoryFaults>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_faults(&self, faults: DirectoryFaults) {
        if let Ok(mut current) = self.faults.write() {
            *current = faults;
        }
    }

    pub fn set_fail_link_writes(&self, fail: bool) {
        if let Ok(mut current) = self.faults.write() {
            current.fail_link_writes = fail;
        }
    }

    /// Store a pre-built record as-is (e.g. identities imported from elsewhere).
    pub fn insert(&self, identity: Identity) -> Result<(), DirectoryError> {
        let mut identities = self.identities.write().map_err(|_| Self::poisoned())?;
        identities.insert(identity.id, identity);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.identities.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn faults(&self) -> DirectoryFaults {
        self.faults.read().map(|f| *f).unwrap_or_default()
    }

    fn poisoned() -> DirectoryError {
        DirectoryError::Storage("lock poisoned".to_string())
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn create_identity(&self, fields: NewIdentity) -> Result<Identity, DirectoryError> {
        let mut identities = self.identities.write().map_err(|_| Self::poisoned())?;
        if identities
            .values()
            .any(|i| i.email.eq_ignore_ascii_case(&fields.email))
        {
            return Err(DirectoryError::DuplicateEmail(fields.email));
        }

        let identity = Identity::from_new(IdentityId::new(), fields, Utc::now());
        identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn get_identity(&self, id: IdentityId) -> Result<Identity, DirectoryError> {
        let identities = self.identities.read().map_err(|_| Self::poisoned())?;
        identities
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound(id))
    }

    async fn set_ledger_link(
        &self,
        id: IdentityId,
        account_id: AccountId,
    ) -> Result<(), DirectoryError> {
        if self.faults().fail_link_writes {
            return Err(DirectoryError::Storage("link write failed".to_string()));
        }

        let mut identities = self.identities.write().map_err(|_| Self::poisoned())?;
        let identity = identities.get_mut(&id).ok_or(DirectoryError::NotFound(id))?;
        if let Some(existing) = identity.ledger_account_id {
            return Err(DirectoryError::AlreadyLinked {
                identity: id,
                existing,
            });
        }
        identity.ledger_account_id = Some(account_id);
        identity.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_identity(&self, id: IdentityId) -> Result<(), DirectoryError> {
        if self.faults().fail_deletes {
            return Err(DirectoryError::Storage("delete failed".to_string()));
        }

        let mut identities = self.identities.write().map_err(|_| Self::poisoned())?;
        identities
            .remove(&id)
            .map(|_| ())
            .ok_or(DirectoryError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> NewIdentity {
        NewIdentity {
            email: "alice@example.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Doe".to_string(),
        }
    }

    #[tokio::test]
    async fn created_identity_starts_unlinked() {
        let dir = InMemoryDirectory::new();
        let identity = dir.create_identity(alice()).await.unwrap();

        assert!(!identity.is_linked());
        assert!(identity.is_active);
        assert_eq!(dir.get_identity(identity.id).await.unwrap(), identity);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let dir = InMemoryDirectory::new();
        dir.create_identity(alice()).await.unwrap();

        let mut again = alice();
        again.email = "ALICE@example.com".to_string();
        let err = dir.create_identity(again).await.unwrap_err();
        assert!(matches!(err, DirectoryError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn link_is_immutable() {
        let dir = InMemoryDirectory::new();
        let identity = dir.create_identity(alice()).await.unwrap();

        dir.set_ledger_link(identity.id, AccountId::new(5000))
            .await
            .unwrap();
        let err = dir
            .set_ledger_link(identity.id, AccountId::new(6000))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DirectoryError::AlreadyLinked {
                identity: identity.id,
                existing: AccountId::new(5000),
            }
        );
        let stored = dir.get_identity(identity.id).await.unwrap();
        assert_eq!(stored.ledger_account_id, Some(AccountId::new(5000)));
    }

    #[tokio::test]
    async fn deleted_identity_is_not_found() {
        let dir = InMemoryDirectory::new();
        let identity = dir.create_identity(alice()).await.unwrap();

        dir.delete_identity(identity.id).await.unwrap();
        assert_eq!(
            dir.get_identity(identity.id).await.unwrap_err(),
            DirectoryError::NotFound(identity.id)
        );
        assert!(dir.is_empty());
    }

    #[tokio::test]
    async fn link_write_fault_leaves_identity_unlinked() {
        let dir = InMemoryDirectory::new();
        let identity = dir.create_identity(alice()).await.unwrap();
        dir.set_fail_link_writes(true);

        assert!(matches!(
            dir.set_ledger_link(identity.id, AccountId::new(5000)).await,
            Err(DirectoryError::Storage(_))
        ));
        assert!(!dir.get_identity(identity.id).await.unwrap().is_linked());
    }
}
