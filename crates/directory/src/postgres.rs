//! Postgres-backed identity directory.
//!
//! Stores records in an `identities` table, created by
//! [`PostgresDirectory::ensure_schema`] when missing:
//!
//! ```sql
//! CREATE TABLE identities (
//!     id                UUID PRIMARY KEY,
//!     email             TEXT NOT NULL UNIQUE,
//!     first_name        TEXT NOT NULL,
//!     last_name         TEXT NOT NULL,
//!     ledger_account_id BIGINT NULL,
//!     is_active         BOOLEAN NOT NULL DEFAULT TRUE,
//!     created_at        TIMESTAMPTZ NOT NULL,
//!     updated_at        TIMESTAMPTZ NOT NULL
//! );
//! ```
//!
//! Ledger account ids are unsigned 64-bit; they are stored bit-for-bit in the
//! signed `BIGINT` column and converted back on read.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | DirectoryError |
//! |------------|----------------------|----------------|
//! | Database (unique violation on email) | `23505` | `DuplicateEmail` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / network / other | N/A | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use ledgerbank_core::{AccountId, IdentityId};

use crate::identity::{Identity, NewIdentity};
use crate::store::{DirectoryError, IdentityDirectory};

/// Postgres-backed identity directory.
///
/// Uses the SQLx connection pool, which is safe to share across tasks.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: Arc<PgPool>,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the `identities` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS identities (
                id                UUID PRIMARY KEY,
                email             TEXT NOT NULL UNIQUE,
                first_name        TEXT NOT NULL,
                last_name         TEXT NOT NULL,
                ledger_account_id BIGINT NULL,
                is_active         BOOLEAN NOT NULL DEFAULT TRUE,
                created_at        TIMESTAMPTZ NOT NULL,
                updated_at        TIMESTAMPTZ NOT NULL
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
struct IdentityRow {
    id: uuid::Uuid,
    email: String,
    first_name: String,
    last_name: String,
    ledger_account_id: Option<i64>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for IdentityRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(IdentityRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            ledger_account_id: row.try_get("ledger_account_id")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            id: IdentityId::from_uuid(row.id),
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            ledger_account_id: row.ledger_account_id.map(|raw| AccountId::new(raw as u64)),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_IDENTITY: &str = r#"
    SELECT id, email, first_name, last_name, ledger_account_id, is_active, created_at, updated_at
    FROM identities
    WHERE id = $1
"#;

#[async_trait]
impl IdentityDirectory for PostgresDirectory {
    #[instrument(skip_all, fields(email = %request.email), err)]
    async fn create_identity(&self, request: NewIdentity) -> Result<Identity, DirectoryError> {
        let identity = Identity::from_new(IdentityId::new(), request, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO identities (
                id, email, first_name, last_name, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(identity.id.as_uuid())
        .bind(&identity.email)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(identity.is_active)
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_identity", e, Some(&identity.email)))?;

        Ok(identity)
    }

    #[instrument(skip_all, fields(identity_id = %id), err)]
    async fn get_identity(&self, id: IdentityId) -> Result<Identity, DirectoryError> {
        let row = sqlx::query(SELECT_IDENTITY)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_identity", e, None))?
            .ok_or(DirectoryError::NotFound(id))?;

        let row = IdentityRow::from_row(&row)
            .map_err(|e| DirectoryError::Storage(format!("failed to decode identity row: {e}")))?;
        Ok(row.into())
    }

    #[instrument(skip_all, fields(identity_id = %id, account_id = %account_id), err)]
    async fn set_ledger_link(
        &self,
        id: IdentityId,
        account_id: AccountId,
    ) -> Result<(), DirectoryError> {
        // Conditional update keeps the link write-once under concurrent callers.
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET ledger_account_id = $2, updated_at = NOW()
            WHERE id = $1 AND ledger_account_id IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(account_id.get() as i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_ledger_link", e, None))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing updated: either the identity is gone or it is already linked.
        let existing = self.get_identity(id).await?;
        match existing.ledger_account_id {
            Some(existing) => Err(DirectoryError::AlreadyLinked {
                identity: id,
                existing,
            }),
            None => Err(DirectoryError::Storage(format!(
                "ledger link for {id} was not written"
            ))),
        }
    }

    #[instrument(skip_all, fields(identity_id = %id), err)]
    async fn delete_identity(&self, id: IdentityId) -> Result<(), DirectoryError> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_identity", e, None))?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound(id));
        }
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error, email: Option<&str>) -> DirectoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let is_unique_violation = db_err.code().is_some_and(|code| code.as_ref() == "23505");
            match (is_unique_violation, email) {
                (true, Some(email)) => DirectoryError::DuplicateEmail(email.to_string()),
                _ => DirectoryError::Storage(format!(
                    "database error in {}: {}",
                    operation,
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolClosed => {
            DirectoryError::Storage(format!("connection pool closed in {operation}"))
        }
        _ => DirectoryError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}
