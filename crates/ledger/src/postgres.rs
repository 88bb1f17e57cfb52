//! Postgres-backed ledger engine.
//!
//! Accounts and transfers live in two tables, created by
//! [`PostgresLedger::ensure_schema`] when missing:
//!
//! ```sql
//! CREATE TABLE ledger_accounts (
//!     id                             BIGINT PRIMARY KEY,
//!     ledger                         INTEGER NOT NULL,
//!     category                       SMALLINT NOT NULL,
//!     debits_must_not_exceed_credits BOOLEAN NOT NULL,
//!     debits_posted                  BIGINT NOT NULL DEFAULT 0,
//!     credits_posted                 BIGINT NOT NULL DEFAULT 0
//! );
//!
//! CREATE TABLE ledger_transfers (
//!     id                BIGINT PRIMARY KEY,
//!     ledger            INTEGER NOT NULL,
//!     debit_account_id  BIGINT NOT NULL REFERENCES ledger_accounts (id),
//!     credit_account_id BIGINT NOT NULL REFERENCES ledger_accounts (id),
//!     amount            BIGINT NOT NULL,
//!     code              SMALLINT NOT NULL,
//!     created_at        TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! Ids and totals are unsigned 64-bit and stored bit-for-bit in `BIGINT`
//! columns. Posted totals are capped at `i64::MAX` so they stay non-negative
//! in storage; a transfer that would pass the cap is rejected as overflow.
//!
//! ## Posting
//!
//! `create_transfer` runs in one transaction: it checks the transfer id, locks
//! both account rows with `SELECT .. FOR UPDATE` in id order, applies
//! [`plan_posting`], inserts the transfer and updates both totals. Concurrent
//! transfers touching the same account serialize on the row lock, so the
//! `debits_must_not_exceed_credits` flag holds without any caller-side locking.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerError |
//! |------------|----------------------|-------------|
//! | Database (unique violation on account id) | `23505` | `AccountExists` |
//! | Database (unique violation on transfer id) | `23505` | `TransferExists` |
//! | Database (other) | Any other | `Unavailable` |
//! | PoolClosed / network / other | N/A | `Unavailable` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use ledgerbank_core::{AccountId, Amount, TransferId};

use crate::account::{AccountCategory, AccountFlags, LedgerAccount};
use crate::gateway::{LedgerError, LedgerGateway, TransferRejection};
use crate::posting::plan_posting;
use crate::transfer::Transfer;

/// Largest posted total a `BIGINT` column holds without going negative.
const TOTAL_CEILING: u64 = i64::MAX as u64;

/// Postgres-backed ledger engine.
///
/// Uses the SQLx connection pool, which is safe to share across tasks.
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: Arc<PgPool>,
    partition: u32,
}

impl PostgresLedger {
    pub fn new(pool: PgPool, partition: u32) -> Self {
        Self {
            pool: Arc::new(pool),
            partition,
        }
    }

    /// Create the ledger tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_accounts (
                id                             BIGINT PRIMARY KEY,
                ledger                         INTEGER NOT NULL,
                category                       SMALLINT NOT NULL,
                debits_must_not_exceed_credits BOOLEAN NOT NULL,
                debits_posted                  BIGINT NOT NULL DEFAULT 0,
                credits_posted                 BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e, None))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_transfers (
                id                BIGINT PRIMARY KEY,
                ledger            INTEGER NOT NULL,
                debit_account_id  BIGINT NOT NULL REFERENCES ledger_accounts (id),
                credit_account_id BIGINT NOT NULL REFERENCES ledger_accounts (id),
                amount            BIGINT NOT NULL,
                code              SMALLINT NOT NULL,
                created_at        TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e, None))?;

        Ok(())
    }
}

#[derive(Debug)]
struct AccountRow {
    id: i64,
    ledger: i32,
    category: i16,
    debits_must_not_exceed_credits: bool,
    debits_posted: i64,
    credits_posted: i64,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for AccountRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            ledger: row.try_get("ledger")?,
            category: row.try_get("category")?,
            debits_must_not_exceed_credits: row.try_get("debits_must_not_exceed_credits")?,
            debits_posted: row.try_get("debits_posted")?,
            credits_posted: row.try_get("credits_posted")?,
        })
    }
}

impl TryFrom<AccountRow> for LedgerAccount {
    type Error = LedgerError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let category = AccountCategory::from_code(row.category as u16).ok_or_else(|| {
            corrupt_row(format!("account {} has unknown category {}", row.id, row.category))
        })?;
        Ok(LedgerAccount {
            id: AccountId::new(row.id as u64),
            ledger: row.ledger as u32,
            category,
            flags: AccountFlags {
                debits_must_not_exceed_credits: row.debits_must_not_exceed_credits,
            },
            debits_posted: row.debits_posted as u64,
            credits_posted: row.credits_posted as u64,
        })
    }
}

#[derive(Debug)]
struct TransferRow {
    id: i64,
    ledger: i32,
    debit_account_id: i64,
    credit_account_id: i64,
    amount: i64,
    code: i16,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for TransferRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransferRow {
            id: row.try_get("id")?,
            ledger: row.try_get("ledger")?,
            debit_account_id: row.try_get("debit_account_id")?,
            credit_account_id: row.try_get("credit_account_id")?,
            amount: row.try_get("amount")?,
            code: row.try_get("code")?,
        })
    }
}

impl TryFrom<TransferRow> for Transfer {
    type Error = LedgerError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        let amount = Amount::new(row.amount as u64)
            .map_err(|e| corrupt_row(format!("transfer {}: {e}", row.id)))?;
        Ok(Transfer {
            id: TransferId::new(row.id as u64),
            ledger: row.ledger as u32,
            debit_account_id: AccountId::new(row.debit_account_id as u64),
            credit_account_id: AccountId::new(row.credit_account_id as u64),
            amount,
            code: row.code as u16,
        })
    }
}

const SELECT_ACCOUNT: &str = r#"
    SELECT id, ledger, category, debits_must_not_exceed_credits, debits_posted, credits_posted
    FROM ledger_accounts
    WHERE id = $1
"#;

const LOCK_ACCOUNTS: &str = r#"
    SELECT id, ledger, category, debits_must_not_exceed_credits, debits_posted, credits_posted
    FROM ledger_accounts
    WHERE id = ANY($1)
    ORDER BY id
    FOR UPDATE
"#;

const SELECT_TRANSFER: &str = r#"
    SELECT id, ledger, debit_account_id, credit_account_id, amount, code
    FROM ledger_transfers
    WHERE id = $1
"#;

#[async_trait]
impl LedgerGateway for PostgresLedger {
    fn partition(&self) -> u32 {
        self.partition
    }

    #[instrument(skip_all, fields(account_id = %id, category = ?category), err)]
    async fn create_account(
        &self,
        id: AccountId,
        category: AccountCategory,
    ) -> Result<LedgerAccount, LedgerError> {
        let account = LedgerAccount::new(id, self.partition, category);

        sqlx::query(
            r#"
            INSERT INTO ledger_accounts (
                id, ledger, category, debits_must_not_exceed_credits, debits_posted, credits_posted
            )
            VALUES ($1, $2, $3, $4, 0, 0)
            "#,
        )
        .bind(id.get() as i64)
        .bind(account.ledger as i32)
        .bind(category.code() as i16)
        .bind(account.flags.debits_must_not_exceed_credits)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_account", e, Some(LedgerError::AccountExists(id))))?;

        Ok(account)
    }

    #[instrument(skip_all, fields(account_id = %id), err)]
    async fn get_account(&self, id: AccountId) -> Result<LedgerAccount, LedgerError> {
        let row = sqlx::query(SELECT_ACCOUNT)
            .bind(id.get() as i64)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_account", e, None))?
            .ok_or(LedgerError::AccountNotFound(id))?;

        let row = AccountRow::from_row(&row)
            .map_err(|e| corrupt_row(format!("failed to decode account row: {e}")))?;
        row.try_into()
    }

    #[instrument(
        skip_all,
        fields(
            transfer_id = %transfer.id,
            debit = %transfer.debit_account_id,
            credit = %transfer.credit_account_id,
            amount = %transfer.amount,
        ),
        err
    )]
    async fn create_transfer(&self, transfer: Transfer) -> Result<(), LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e, None))?;

        match post_transfer(&mut tx, &transfer).await {
            Ok(()) => {
                tx.commit()
                    .await
                    .map_err(|e| map_sqlx_error("commit_transaction", e, None))?;
                Ok(())
            }
            Err(err) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e, None))?;
                Err(err)
            }
        }
    }

    #[instrument(skip_all, fields(transfer_id = %id), err)]
    async fn lookup_transfer(&self, id: TransferId) -> Result<Option<Transfer>, LedgerError> {
        let row = sqlx::query(SELECT_TRANSFER)
            .bind(id.get() as i64)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("lookup_transfer", e, None))?;

        match row {
            Some(row) => {
                let row = TransferRow::from_row(&row)
                    .map_err(|e| corrupt_row(format!("failed to decode transfer row: {e}")))?;
                row.try_into().map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Validate and apply `transfer` inside an open transaction.
async fn post_transfer(
    tx: &mut Transaction<'_, Postgres>,
    transfer: &Transfer,
) -> Result<(), LedgerError> {
    let existing = sqlx::query("SELECT 1 FROM ledger_transfers WHERE id = $1")
        .bind(transfer.id.get() as i64)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("check_transfer", e, None))?;
    if existing.is_some() {
        return Err(LedgerError::TransferExists(transfer.id));
    }

    if transfer.debit_account_id == transfer.credit_account_id {
        return Err(LedgerError::Rejected(TransferRejection::SameAccount));
    }

    // Locks are taken in id order so two opposite transfers cannot deadlock.
    let ids = vec![
        transfer.debit_account_id.get() as i64,
        transfer.credit_account_id.get() as i64,
    ];
    let rows = sqlx::query(LOCK_ACCOUNTS)
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_accounts", e, None))?;

    let mut accounts = Vec::with_capacity(rows.len());
    for row in &rows {
        let row = AccountRow::from_row(row)
            .map_err(|e| corrupt_row(format!("failed to decode account row: {e}")))?;
        accounts.push(LedgerAccount::try_from(row)?);
    }
    let find = |id: AccountId| {
        accounts
            .iter()
            .find(|account| account.id == id)
            .ok_or(LedgerError::AccountNotFound(id))
    };
    let debit = find(transfer.debit_account_id)?;
    let credit = find(transfer.credit_account_id)?;

    let posting = plan_posting(transfer, debit, credit, TOTAL_CEILING)?;

    sqlx::query(
        r#"
        INSERT INTO ledger_transfers (id, ledger, debit_account_id, credit_account_id, amount, code)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(transfer.id.get() as i64)
    .bind(transfer.ledger as i32)
    .bind(transfer.debit_account_id.get() as i64)
    .bind(transfer.credit_account_id.get() as i64)
    .bind(transfer.amount.get() as i64)
    .bind(transfer.code as i16)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        map_sqlx_error(
            "insert_transfer",
            e,
            Some(LedgerError::TransferExists(transfer.id)),
        )
    })?;

    sqlx::query("UPDATE ledger_accounts SET debits_posted = $2 WHERE id = $1")
        .bind(transfer.debit_account_id.get() as i64)
        .bind(posting.debits_posted as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_debit", e, None))?;

    sqlx::query("UPDATE ledger_accounts SET credits_posted = $2 WHERE id = $1")
        .bind(transfer.credit_account_id.get() as i64)
        .bind(posting.credits_posted as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_credit", e, None))?;

    Ok(())
}

fn corrupt_row(message: String) -> LedgerError {
    LedgerError::Unavailable(format!("corrupt ledger row: {message}"))
}

/// `on_unique` is returned for a unique violation; every other failure leaves
/// the outcome unknown to the caller and maps to `Unavailable`.
fn map_sqlx_error(operation: &str, err: sqlx::Error, on_unique: Option<LedgerError>) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => {
            let is_unique_violation = db_err.code().is_some_and(|code| code.as_ref() == "23505");
            match (is_unique_violation, on_unique) {
                (true, Some(duplicate)) => duplicate,
                _ => LedgerError::Unavailable(format!(
                    "database error in {}: {}",
                    operation,
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolClosed => {
            LedgerError::Unavailable(format!("connection pool closed in {operation}"))
        }
        _ => LedgerError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_row(debits: i64, credits: i64) -> AccountRow {
        AccountRow {
            id: (u64::MAX - 5) as i64,
            ledger: 1,
            category: AccountCategory::User.code() as i16,
            debits_must_not_exceed_credits: true,
            debits_posted: debits,
            credits_posted: credits,
        }
    }

    #[test]
    fn account_row_keeps_high_bit_ids_and_flags() {
        let account = LedgerAccount::try_from(user_row(30, 100)).unwrap();

        assert_eq!(account.id, AccountId::new(u64::MAX - 5));
        assert_eq!(account.category, AccountCategory::User);
        assert!(account.flags.debits_must_not_exceed_credits);
        assert_eq!(account.balance(), 70);
    }

    #[test]
    fn unknown_category_is_a_corrupt_row() {
        let mut row = user_row(0, 0);
        row.category = 42;

        assert!(matches!(
            LedgerAccount::try_from(row),
            Err(LedgerError::Unavailable(msg)) if msg.contains("unknown category")
        ));
    }

    #[test]
    fn transfer_row_round_trips_into_transfer() {
        let row = TransferRow {
            id: 9,
            ledger: 1,
            debit_account_id: 2,
            credit_account_id: (u64::MAX - 5) as i64,
            amount: 250,
            code: 1,
        };

        let transfer = Transfer::try_from(row).unwrap();
        assert_eq!(
            transfer,
            Transfer::new(
                TransferId::new(9),
                1,
                AccountId::new(2),
                AccountId::new(u64::MAX - 5),
                Amount::new(250).unwrap(),
            )
        );
    }

    #[test]
    fn zero_amount_row_is_rejected() {
        let row = TransferRow {
            id: 9,
            ledger: 1,
            debit_account_id: 2,
            credit_account_id: 10,
            amount: 0,
            code: 1,
        };
        assert!(matches!(
            Transfer::try_from(row),
            Err(LedgerError::Unavailable(_))
        ));
    }

    #[test]
    fn pool_closed_maps_to_unavailable() {
        let err = map_sqlx_error(
            "create_transfer",
            sqlx::Error::PoolClosed,
            Some(LedgerError::TransferExists(TransferId::new(1))),
        );
        assert!(matches!(err, LedgerError::Unavailable(msg) if msg.contains("create_transfer")));
    }
}
