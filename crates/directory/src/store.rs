use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use ledgerbank_core::{AccountId, IdentityId};

use crate::identity::{Identity, NewIdentity};

/// Identity directory error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("identity {0} not found")]
    NotFound(IdentityId),

    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    /// The ledger link is immutable once set.
    #[error("identity {identity} already linked to account {existing}")]
    AlreadyLinked {
        identity: IdentityId,
        existing: AccountId,
    },

    #[error("directory storage error: {0}")]
    Storage(String),
}

/// Identity directory operations consumed by the banking core.
///
/// Implementations must be safe for concurrent use by many in-flight requests.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn create_identity(&self, fields: NewIdentity) -> Result<Identity, DirectoryError>;

    async fn get_identity(&self, id: IdentityId) -> Result<Identity, DirectoryError>;

    /// Write the ledger link. Fails with [`DirectoryError::AlreadyLinked`] if a
    /// link is already present.
    async fn set_ledger_link(
        &self,
        id: IdentityId,
        account_id: AccountId,
    ) -> Result<(), DirectoryError>;

    async fn delete_identity(&self, id: IdentityId) -> Result<(), DirectoryError>;
}

#[async_trait]
impl<D> IdentityDirectory for Arc<D>
where
    D: IdentityDirectory + ?Sized,
{
    async fn create_identity(&self, fields: NewIdentity) -> Result<Identity, DirectoryError> {
        (**self).create_identity(fields).await
    }

    async fn get_identity(&self, id: IdentityId) -> Result<Identity, DirectoryError> {
        (**self).get_identity(id).await
    }

    async fn set_ledger_link(
        &self,
        id: IdentityId,
        account_id: AccountId,
    ) -> Result<(), DirectoryError> {
        (**self).set_ledger_link(id, account_id).await
    }

    async fn delete_identity(&self, id: IdentityId) -> Result<(), DirectoryError> {
        (**self).delete_identity(id).await
    }
}
