//! Account provisioning across the directory and the ledger engine.
//!
//! There is no distributed transaction between the two systems. Provisioning
//! runs as a short saga:
//!
//! ```text
//! derive account id ──> create ledger account ──> write directory link
//!                              │ fails                    │ fails
//!                              v                          v
//!                  delete identity (compensate)   ProvisionPartialFailure
//! ```
//!
//! A failed link write leaves a valid ledger account that nothing points at.
//! That state is reported, never repaired by recreating the account: the
//! account id is deterministic, so a retried `provision` or `associate`
//! re-runs only the link step. An existing account is resumed only while it is
//! an untouched user account; anything else at the derived id is a collision.

use tracing::{error, info, instrument, warn};

use ledgerbank_core::{AccountId, IdentityId, account_id_for};
use ledgerbank_directory::{DirectoryError, Identity, IdentityDirectory, NewIdentity};
use ledgerbank_ledger::{AccountCategory, LedgerAccount, LedgerError, LedgerGateway};

use crate::error::BankingError;

pub struct AccountProvisioner<L, D> {
    ledger: L,
    directory: D,
}

impl<L, D> AccountProvisioner<L, D>
where
    L: LedgerGateway,
    D: IdentityDirectory,
{
    pub fn new(ledger: L, directory: D) -> Self {
        Self { ledger, directory }
    }

    /// Create the identity record, then provision its ledger account.
    #[instrument(skip_all, fields(email = %request.email), err)]
    pub async fn register(&self, request: NewIdentity) -> Result<Identity, BankingError> {
        let mut identity = self.directory.create_identity(request).await?;
        let account_id = self.provision(identity.id).await?;
        identity.ledger_account_id = Some(account_id);
        Ok(identity)
    }

    /// Provision the ledger account of an identity that already exists in the
    /// directory.
    ///
    /// An identity that is already linked returns its link untouched. An
    /// untouched user account already at the derived id (left by an earlier
    /// partial failure or a timed-out creation that landed) is linked instead
    /// of recreated. If the ledger step fails the identity record is deleted
    /// before the error is returned.
    #[instrument(skip_all, fields(identity_id = %identity), err)]
    pub async fn provision(&self, identity: IdentityId) -> Result<AccountId, BankingError> {
        let record = self.directory.get_identity(identity).await?;
        if let Some(existing) = record.ledger_account_id {
            return Ok(existing);
        }

        let account_id = account_id_for(identity);

        match self
            .ledger
            .create_account(account_id, AccountCategory::User)
            .await
        {
            Ok(_) => {}
            Err(err @ LedgerError::AccountExists(_)) => {
                if self.linked_to(identity, account_id).await {
                    // A concurrent provision of the same identity finished first.
                    return Ok(account_id);
                }

                // The account exists either way, so a failed read must not roll back.
                let account = self.ledger.get_account(account_id).await?;
                if !is_unclaimed(&account) {
                    self.compensate(identity, &err).await;
                    return Err(BankingError::AccountCollision {
                        identity,
                        account_id,
                    });
                }
                info!(account_id = %account_id, "resuming provisioning with existing ledger account");
            }
            Err(err) => {
                self.compensate(identity, &err).await;
                return Err(err.into());
            }
        }

        self.link(identity, account_id).await?;
        info!(identity_id = %identity, account_id = %account_id, "ledger account provisioned");
        Ok(account_id)
    }

    /// Link a ledger account to an identity that predates this call.
    ///
    /// Used for imported identities and to finish a provisioning that ended in
    /// [`BankingError::ProvisionPartialFailure`]: an existing user account at
    /// the derived id is adopted instead of recreated. Never deletes the
    /// identity.
    #[instrument(skip_all, fields(identity_id = %identity), err)]
    pub async fn associate(&self, identity: IdentityId) -> Result<AccountId, BankingError> {
        let record = self.directory.get_identity(identity).await?;
        if let Some(existing) = record.ledger_account_id {
            return Err(BankingError::AlreadyLinked { identity, existing });
        }

        let account_id = account_id_for(identity);

        match self
            .ledger
            .create_account(account_id, AccountCategory::User)
            .await
        {
            Ok(_) => {}
            Err(LedgerError::AccountExists(_)) => {
                let account = self.ledger.get_account(account_id).await?;
                if account.category != AccountCategory::User {
                    return Err(BankingError::AccountCollision {
                        identity,
                        account_id,
                    });
                }
                info!(account_id = %account_id, "adopting existing ledger account");
            }
            Err(e) => return Err(e.into()),
        }

        self.link(identity, account_id).await?;
        info!(identity_id = %identity, account_id = %account_id, "ledger account associated");
        Ok(account_id)
    }

    async fn link(&self, identity: IdentityId, account_id: AccountId) -> Result<(), BankingError> {
        match self.directory.set_ledger_link(identity, account_id).await {
            Ok(()) => Ok(()),
            Err(DirectoryError::AlreadyLinked { existing, .. }) if existing == account_id => Ok(()),
            Err(e) => {
                error!(
                    identity_id = %identity,
                    account_id = %account_id,
                    error = %e,
                    "ledger account created but directory link failed; operator follow-up required"
                );
                Err(BankingError::ProvisionPartialFailure {
                    identity,
                    account_id,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn linked_to(&self, identity: IdentityId, account_id: AccountId) -> bool {
        matches!(
            self.directory.get_identity(identity).await,
            Ok(record) if record.ledger_account_id == Some(account_id)
        )
    }

    async fn compensate(&self, identity: IdentityId, cause: &LedgerError) {
        match self.directory.delete_identity(identity).await {
            Ok(()) => warn!(
                identity_id = %identity,
                cause = %cause,
                "ledger account creation failed; identity rolled back"
            ),
            Err(e) => error!(
                identity_id = %identity,
                cause = %cause,
                error = %e,
                "ledger account creation failed and identity rollback failed"
            ),
        }
    }
}

/// A user account nobody has posted to yet.
fn is_unclaimed(account: &LedgerAccount) -> bool {
    account.category == AccountCategory::User
        && account.debits_posted == 0
        && account.credits_posted == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use ledgerbank_core::{Amount, MASTER_CREDIT_ACCOUNT, TransferId};
    use ledgerbank_directory::InMemoryDirectory;
    use ledgerbank_ledger::{InMemoryLedger, Transfer, ensure_master_accounts};

    type Provisioner = AccountProvisioner<Arc<InMemoryLedger>, Arc<InMemoryDirectory>>;

    async fn setup() -> (Provisioner, Arc<InMemoryLedger>, Arc<InMemoryDirectory>) {
        let ledger = Arc::new(InMemoryLedger::new(1));
        ensure_master_accounts(&ledger).await;
        let directory = Arc::new(InMemoryDirectory::new());
        (
            AccountProvisioner::new(ledger.clone(), directory.clone()),
            ledger,
            directory,
        )
    }

    fn fields(email: &str) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }

    #[tokio::test]
    async fn provision_creates_user_account_and_links_it() {
        let (provisioner, ledger, directory) = setup().await;
        let identity = directory.create_identity(fields("a@example.com")).await.unwrap();

        let account_id = provisioner.provision(identity.id).await.unwrap();

        assert_eq!(account_id, account_id_for(identity.id));
        let stored = directory.get_identity(identity.id).await.unwrap();
        assert_eq!(stored.ledger_account_id, Some(account_id));
        let account = ledger.get_account(account_id).await.unwrap();
        assert_eq!(account.category, AccountCategory::User);
    }

    #[tokio::test]
    async fn provision_is_idempotent_for_linked_identity() {
        let (provisioner, ledger, directory) = setup().await;
        let identity = directory.create_identity(fields("a@example.com")).await.unwrap();
        let first = provisioner.provision(identity.id).await.unwrap();

        ledger.set_unavailable(true);
        let second = provisioner.provision(identity.id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn ledger_failure_deletes_identity() {
        let (provisioner, ledger, directory) = setup().await;
        let identity = directory.create_identity(fields("a@example.com")).await.unwrap();
        ledger.set_fail_account_creation(true);

        let err = provisioner.provision(identity.id).await.unwrap_err();

        assert!(matches!(err, BankingError::EngineUnavailable(_)));
        assert_eq!(
            directory.get_identity(identity.id).await.unwrap_err(),
            DirectoryError::NotFound(identity.id)
        );
    }

    #[tokio::test]
    async fn link_failure_is_partial_and_keeps_identity() {
        let (provisioner, ledger, directory) = setup().await;
        let identity = directory.create_identity(fields("a@example.com")).await.unwrap();
        directory.set_fail_link_writes(true);

        let err = provisioner.provision(identity.id).await.unwrap_err();
        let expected_account = account_id_for(identity.id);

        match err {
            BankingError::ProvisionPartialFailure {
                identity: id,
                account_id,
                ..
            } => {
                assert_eq!(id, identity.id);
                assert_eq!(account_id, expected_account);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert!(directory.get_identity(identity.id).await.is_ok());
        assert!(ledger.get_account(expected_account).await.is_ok());
    }

    #[tokio::test]
    async fn associate_recovers_partial_failure() {
        let (provisioner, _ledger, directory) = setup().await;
        let identity = directory.create_identity(fields("a@example.com")).await.unwrap();
        directory.set_fail_link_writes(true);
        assert!(provisioner.provision(identity.id).await.is_err());

        directory.set_fail_link_writes(false);
        let account_id = provisioner.associate(identity.id).await.unwrap();

        assert_eq!(account_id, account_id_for(identity.id));
        let stored = directory.get_identity(identity.id).await.unwrap();
        assert_eq!(stored.ledger_account_id, Some(account_id));
    }

    #[tokio::test]
    async fn associate_rejects_linked_identity() {
        let (provisioner, _ledger, directory) = setup().await;
        let identity = provisioner.register(fields("a@example.com")).await.unwrap();

        let err = provisioner.associate(identity.id).await.unwrap_err();
        assert!(matches!(err, BankingError::AlreadyLinked { .. }));
    }

    #[tokio::test]
    async fn associate_links_imported_identity() {
        let (provisioner, _ledger, directory) = setup().await;
        let imported =
            Identity::from_new(IdentityId::new(), fields("legacy@example.com"), Utc::now());
        directory.insert(imported.clone()).unwrap();

        let account_id = provisioner.associate(imported.id).await.unwrap();
        assert_eq!(account_id, account_id_for(imported.id));
    }

    #[tokio::test]
    async fn colliding_account_id_rolls_back() {
        let (provisioner, ledger, directory) = setup().await;
        let identity = directory.create_identity(fields("a@example.com")).await.unwrap();
        // Another identity already owns the derived id and has funds on it.
        let account_id = account_id_for(identity.id);
        ledger
            .create_account(account_id, AccountCategory::User)
            .await
            .unwrap();
        ledger
            .create_transfer(Transfer::new(
                TransferId::new(1),
                1,
                MASTER_CREDIT_ACCOUNT,
                account_id,
                Amount::new(50).unwrap(),
            ))
            .await
            .unwrap();

        let err = provisioner.provision(identity.id).await.unwrap_err();

        assert!(matches!(err, BankingError::AccountCollision { .. }));
        assert!(directory.get_identity(identity.id).await.is_err());
    }

    #[tokio::test]
    async fn retried_provision_links_account_left_by_partial_failure() {
        let (provisioner, ledger, directory) = setup().await;
        let identity = directory.create_identity(fields("a@example.com")).await.unwrap();
        directory.set_fail_link_writes(true);
        assert!(matches!(
            provisioner.provision(identity.id).await,
            Err(BankingError::ProvisionPartialFailure { .. })
        ));

        directory.set_fail_link_writes(false);
        let account_id = provisioner.provision(identity.id).await.unwrap();

        assert_eq!(account_id, account_id_for(identity.id));
        let stored = directory.get_identity(identity.id).await.unwrap();
        assert_eq!(stored.ledger_account_id, Some(account_id));
        assert!(ledger.get_account(account_id).await.is_ok());
    }

    #[tokio::test]
    async fn existing_account_of_other_category_is_a_collision() {
        let (provisioner, ledger, directory) = setup().await;
        let identity = directory.create_identity(fields("a@example.com")).await.unwrap();
        ledger
            .create_account(account_id_for(identity.id), AccountCategory::MasterDebit)
            .await
            .unwrap();

        let err = provisioner.provision(identity.id).await.unwrap_err();

        assert!(matches!(err, BankingError::AccountCollision { .. }));
        assert!(directory.get_identity(identity.id).await.is_err());
    }

    #[tokio::test]
    async fn register_returns_linked_identity() {
        let (provisioner, _ledger, directory) = setup().await;
        let identity = provisioner.register(fields("a@example.com")).await.unwrap();

        assert_eq!(identity.ledger_account_id, Some(account_id_for(identity.id)));
        let stored = directory.get_identity(identity.id).await.unwrap();
        assert_eq!(stored.ledger_account_id, identity.ledger_account_id);
    }
}
