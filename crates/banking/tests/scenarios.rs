//! End-to-end flows through `BankingService` against the in-memory adapters.

use std::sync::Arc;

use proptest::prelude::*;

use ledgerbank_banking::{BankingError, BankingOptions, BankingService};
use ledgerbank_core::{
    IdentityId, MASTER_CREDIT_ACCOUNT, MASTER_DEBIT_ACCOUNT, TransferId, account_id_for,
};
use ledgerbank_directory::{
    DirectoryError, Identity, IdentityDirectory, InMemoryDirectory, NewIdentity,
};
use ledgerbank_ledger::{InMemoryLedger, LedgerGateway};

type Service = BankingService<Arc<InMemoryLedger>, Arc<InMemoryDirectory>>;

struct Harness {
    service: Service,
    ledger: Arc<InMemoryLedger>,
    directory: Arc<InMemoryDirectory>,
}

async fn harness(options: BankingOptions) -> Harness {
    let ledger = Arc::new(InMemoryLedger::new(1));
    let directory = Arc::new(InMemoryDirectory::new());
    let service = BankingService::start(ledger.clone(), directory.clone(), options).await;
    Harness {
        service,
        ledger,
        directory,
    }
}

fn person(email: &str) -> NewIdentity {
    NewIdentity {
        email: email.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    }
}

async fn registered(h: &Harness, email: &str) -> Identity {
    h.service.register(person(email)).await.unwrap()
}

#[tokio::test]
async fn start_creates_both_master_accounts() {
    let h = harness(BankingOptions::default()).await;

    assert!(!h.service.bootstrap_report().is_degraded());
    assert!(h.ledger.get_account(MASTER_DEBIT_ACCOUNT).await.is_ok());
    assert!(h.ledger.get_account(MASTER_CREDIT_ACCOUNT).await.is_ok());

    // A second start over the same engine is a no-op.
    let again = BankingService::start(
        h.ledger.clone(),
        h.directory.clone(),
        BankingOptions::default(),
    )
    .await;
    assert!(!again.bootstrap_report().is_degraded());
}

#[tokio::test]
async fn start_survives_unreachable_engine() {
    let ledger = Arc::new(InMemoryLedger::new(1));
    ledger.set_unavailable(true);
    let service = BankingService::start(
        ledger,
        Arc::new(InMemoryDirectory::new()),
        BankingOptions::default(),
    )
    .await;

    assert!(service.bootstrap_report().is_degraded());
}

#[tokio::test]
async fn balance_before_provisioning_is_zero() {
    let h = harness(BankingOptions::default()).await;
    let identity = h.directory.create_identity(person("u@example.com")).await.unwrap();

    assert_eq!(h.service.balance(identity.id).await.unwrap(), 0);
    assert_eq!(
        h.service.deposit(identity.id, 10).await.unwrap_err(),
        BankingError::AccountNotLinked(identity.id)
    );
}

#[tokio::test]
async fn deposit_then_withdraw_scenario() {
    let h = harness(BankingOptions::default()).await;
    let u1 = registered(&h, "u1@example.com").await;

    h.service.deposit(u1.id, 10_000).await.unwrap();
    assert_eq!(h.service.balance(u1.id).await.unwrap(), 10_000);

    h.service.withdraw(u1.id, 3_000).await.unwrap();
    assert_eq!(h.service.balance(u1.id).await.unwrap(), 7_000);

    let err = h.service.withdraw(u1.id, 8_000).await.unwrap_err();
    assert!(matches!(
        err,
        BankingError::InsufficientFunds { requested: 8_000, .. }
    ));
    assert_eq!(h.service.balance(u1.id).await.unwrap(), 7_000);
}

#[tokio::test]
async fn transfer_moves_funds_between_customers() {
    let h = harness(BankingOptions::default()).await;
    let u1 = registered(&h, "u1@example.com").await;
    let u2 = registered(&h, "u2@example.com").await;

    h.service.deposit(u1.id, 5_000).await.unwrap();
    h.service.transfer(u1.id, u2.id, 2_000).await.unwrap();

    assert_eq!(h.service.balance(u1.id).await.unwrap(), 3_000);
    assert_eq!(h.service.balance(u2.id).await.unwrap(), 2_000);

    let err = h.service.transfer(u1.id, u2.id, 4_000).await.unwrap_err();
    assert!(matches!(err, BankingError::InsufficientFunds { .. }));
    assert_eq!(h.service.balance(u1.id).await.unwrap(), 3_000);
    assert_eq!(h.service.balance(u2.id).await.unwrap(), 2_000);
}

#[tokio::test]
async fn transfer_to_self_is_rejected() {
    let h = harness(BankingOptions::default()).await;
    let u1 = registered(&h, "u1@example.com").await;
    h.service.deposit(u1.id, 100).await.unwrap();

    assert_eq!(
        h.service.transfer(u1.id, u1.id, 50).await.unwrap_err(),
        BankingError::SameAccount
    );
    assert_eq!(h.service.balance(u1.id).await.unwrap(), 100);
}

#[tokio::test]
async fn zero_amount_is_rejected_before_any_engine_call() {
    let h = harness(BankingOptions::default()).await;
    let u1 = registered(&h, "u1@example.com").await;
    let before = h.ledger.transfer_count();

    for result in [
        h.service.deposit(u1.id, 0).await,
        h.service.withdraw(u1.id, 0).await,
        h.service.transfer(u1.id, IdentityId::new(), 0).await,
    ] {
        assert!(matches!(result, Err(BankingError::InvalidAmount(_))));
    }
    assert_eq!(h.ledger.transfer_count(), before);
}

#[tokio::test]
async fn retried_transfer_id_is_applied_once() {
    let h = harness(BankingOptions::default()).await;
    let u1 = registered(&h, "u1@example.com").await;
    let id = TransferId::new(42);

    h.service.deposit_with_id(u1.id, 700, id).await.unwrap();
    let err = h.service.deposit_with_id(u1.id, 700, id).await.unwrap_err();

    assert_eq!(err, BankingError::DuplicateSubmission(id));
    assert_eq!(h.service.balance(u1.id).await.unwrap(), 700);
}

#[tokio::test]
async fn retried_debits_are_reported_as_duplicates() {
    let h = harness(BankingOptions::default()).await;
    let u1 = registered(&h, "u1@example.com").await;
    let u2 = registered(&h, "u2@example.com").await;
    h.service.deposit(u1.id, 100).await.unwrap();

    let withdrawal = TransferId::new(777);
    h.service.withdraw_with_id(u1.id, 60, withdrawal).await.unwrap();
    assert_eq!(
        h.service.withdraw_with_id(u1.id, 60, withdrawal).await.unwrap_err(),
        BankingError::DuplicateSubmission(withdrawal)
    );

    let transfer = TransferId::new(778);
    h.service.transfer_with_id(u1.id, u2.id, 40, transfer).await.unwrap();
    assert_eq!(
        h.service.transfer_with_id(u1.id, u2.id, 40, transfer).await.unwrap_err(),
        BankingError::DuplicateSubmission(transfer)
    );

    assert_eq!(h.service.balance(u1.id).await.unwrap(), 0);
    assert_eq!(h.service.balance(u2.id).await.unwrap(), 40);
}

#[tokio::test]
async fn failed_provisioning_removes_identity() {
    let h = harness(BankingOptions::default()).await;
    h.ledger.set_fail_account_creation(true);

    let err = h.service.register(person("u1@example.com")).await.unwrap_err();
    assert!(matches!(err, BankingError::EngineUnavailable(_)));
    assert!(h.directory.is_empty());

    // The email is free again once the engine recovers.
    h.ledger.set_fail_account_creation(false);
    let identity = registered(&h, "u1@example.com").await;
    assert_eq!(identity.ledger_account_id, Some(account_id_for(identity.id)));
}

#[tokio::test]
async fn provision_rollback_deletes_existing_identity() {
    let h = harness(BankingOptions::default()).await;
    let identity = h.directory.create_identity(person("u@example.com")).await.unwrap();
    h.ledger.set_unavailable(true);

    assert!(h.service.provision(identity.id).await.is_err());
    assert_eq!(
        h.directory.get_identity(identity.id).await.unwrap_err(),
        DirectoryError::NotFound(identity.id)
    );
}

#[tokio::test]
async fn partial_failure_recovers_through_associate() {
    let h = harness(BankingOptions::default()).await;
    let identity = h.directory.create_identity(person("u@example.com")).await.unwrap();
    h.directory.set_fail_link_writes(true);

    let err = h.service.provision(identity.id).await.unwrap_err();
    assert!(matches!(err, BankingError::ProvisionPartialFailure { .. }));
    assert_eq!(h.service.balance(identity.id).await.unwrap(), 0);

    h.directory.set_fail_link_writes(false);
    let account_id = h.service.associate(identity.id).await.unwrap();
    assert_eq!(account_id, account_id_for(identity.id));

    h.service.deposit(identity.id, 300).await.unwrap();
    assert_eq!(h.service.balance(identity.id).await.unwrap(), 300);
    assert_eq!(h.service.account(identity.id).await.unwrap().id, account_id);
}

#[tokio::test]
async fn partial_failure_recovers_through_retried_provision() {
    let h = harness(BankingOptions::default()).await;
    let identity = h.directory.create_identity(person("u@example.com")).await.unwrap();
    h.directory.set_fail_link_writes(true);
    assert!(matches!(
        h.service.provision(identity.id).await,
        Err(BankingError::ProvisionPartialFailure { .. })
    ));

    h.directory.set_fail_link_writes(false);
    let account_id = h.service.provision(identity.id).await.unwrap();

    assert_eq!(account_id, account_id_for(identity.id));
    let stored = h.directory.get_identity(identity.id).await.unwrap();
    assert_eq!(stored.ledger_account_id, Some(account_id));
    h.service.deposit(identity.id, 300).await.unwrap();
    assert_eq!(h.service.balance(identity.id).await.unwrap(), 300);
}

#[tokio::test]
async fn balance_degrades_to_zero_when_engine_is_down() {
    let h = harness(BankingOptions::default()).await;
    let u1 = registered(&h, "u1@example.com").await;
    h.service.deposit(u1.id, 900).await.unwrap();

    h.ledger.set_unavailable(true);
    assert_eq!(h.service.balance(u1.id).await.unwrap(), 0);
    assert!(matches!(
        h.service.withdraw(u1.id, 10).await,
        Err(BankingError::EngineUnavailable(_))
    ));

    h.ledger.set_unavailable(false);
    assert_eq!(h.service.balance(u1.id).await.unwrap(), 900);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_withdrawals_never_overdraw() {
    let h = harness(BankingOptions {
        serialize_debits: true,
    })
    .await;
    let u1 = registered(&h, "u1@example.com").await;
    h.service.deposit(u1.id, 100).await.unwrap();

    let service = Arc::new(h.service);
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.withdraw(u1.id, 30).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(BankingError::InsufficientFunds { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(succeeded, 3);
    assert_eq!(service.balance(u1.id).await.unwrap(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_withdrawals_rely_on_engine_flag() {
    let h = harness(BankingOptions::default()).await;
    let u1 = registered(&h, "u1@example.com").await;
    h.service.deposit(u1.id, 100).await.unwrap();

    let service = Arc::new(h.service);
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.withdraw(u1.id, 30).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(BankingError::InsufficientFunds { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    // Pre-flight checks race without locks; the account flag still holds.
    assert_eq!(succeeded, 3);
    assert_eq!(service.balance(u1.id).await.unwrap(), 10);
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn deposit_and_withdraw_arithmetic(deposit in 1u64..1_000_000, withdraw in 1u64..1_000_000) {
        runtime().block_on(async {
            let h = harness(BankingOptions::default()).await;
            let u1 = registered(&h, "u1@example.com").await;

            h.service.deposit(u1.id, deposit).await.unwrap();
            let result = h.service.withdraw(u1.id, withdraw).await;

            let expected = if withdraw <= deposit {
                assert!(result.is_ok());
                deposit - withdraw
            } else {
                assert!(matches!(result, Err(BankingError::InsufficientFunds { .. })));
                deposit
            };
            assert_eq!(h.service.balance(u1.id).await.unwrap(), expected as i64);
        });
    }

    #[test]
    fn transfers_preserve_the_customer_sum(
        opening in 1u64..100_000,
        amounts in proptest::collection::vec(1u64..50_000, 1..8),
    ) {
        runtime().block_on(async {
            let h = harness(BankingOptions::default()).await;
            let u1 = registered(&h, "u1@example.com").await;
            let u2 = registered(&h, "u2@example.com").await;
            h.service.deposit(u1.id, opening).await.unwrap();

            for (i, amount) in amounts.into_iter().enumerate() {
                let (from, to) = if i % 2 == 0 { (u1.id, u2.id) } else { (u2.id, u1.id) };
                let _ = h.service.transfer(from, to, amount).await;

                let a = h.service.balance(u1.id).await.unwrap();
                let b = h.service.balance(u2.id).await.unwrap();
                assert!(a >= 0 && b >= 0);
                assert_eq!(a + b, opening as i64);
            }
        });
    }
}
