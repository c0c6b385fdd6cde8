use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::Repository;
use crate::{
    error::RepositoryError,
    models::{Account, AccountKind, Level, NewAccount, Session, Taxon, TaxonRequest},
};

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Table and column names come from `AccountKind` / `Level` (static strings only);
/// every value is bound as a parameter.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Column list selecting an `Account` from either credential table.
fn account_columns(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::Admin => {
            "id, username, password_hash, token, is_active, is_superadmin, is_deleted, created_at, updated_at"
        }
        AccountKind::User => {
            "id, username, password_hash, token, is_active, FALSE AS is_superadmin, is_deleted, created_at, updated_at"
        }
    }
}

/// Column list selecting a `Taxon` from any hierarchy table.
fn taxon_columns(level: Level) -> String {
    let parent = level.parent_column().unwrap_or("NULL::BIGINT");
    format!("id, name_lt, name_ru, {parent} AS parent_id, is_deleted")
}

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    account_kind: String,
    account_id: i64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let kind = AccountKind::parse(&row.account_kind).ok_or_else(|| {
            RepositoryError::Constraint(format!("unknown account kind '{}'", row.account_kind))
        })?;
        Ok(Session {
            id: row.id,
            kind,
            account_id: row.account_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_account_by_username(
        &self,
        kind: AccountKind,
        username: &str,
    ) -> Result<Option<Account>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE username = $1 AND is_deleted = FALSE",
            account_columns(kind),
            kind.table()
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_account_row(
        &self,
        kind: AccountKind,
        id: i64,
    ) -> Result<Option<Account>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            account_columns(kind),
            kind.table()
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_account(
        &self,
        kind: AccountKind,
        id: i64,
    ) -> Result<Option<Account>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 AND is_deleted = FALSE",
            account_columns(kind),
            kind.table()
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_accounts(&self, kind: AccountKind) -> Result<Vec<Account>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE is_deleted = FALSE ORDER BY id DESC",
            account_columns(kind),
            kind.table()
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_account(
        &self,
        kind: AccountKind,
        account: NewAccount,
    ) -> Result<Account, RepositoryError> {
        let columns = account_columns(kind);
        let created = match kind {
            AccountKind::Admin => {
                let sql = format!(
                    "INSERT INTO admins (username, password_hash, is_superadmin) \
                     VALUES ($1, $2, $3) RETURNING {columns}"
                );
                sqlx::query_as::<_, Account>(&sql)
                    .bind(&account.username)
                    .bind(&account.password_hash)
                    .bind(account.is_superadmin)
                    .fetch_one(&self.pool)
                    .await?
            }
            AccountKind::User => {
                let sql = format!(
                    "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING {columns}"
                );
                sqlx::query_as::<_, Account>(&sql)
                    .bind(&account.username)
                    .bind(&account.password_hash)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(created)
    }

    async fn update_credentials(
        &self,
        kind: AccountKind,
        id: i64,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let sql = format!(
            "UPDATE {} SET username = $1, password_hash = $2, updated_at = NOW() WHERE id = $3",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(username)
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_account_token(
        &self,
        kind: AccountKind,
        id: i64,
        token: &str,
    ) -> Result<(), RepositoryError> {
        let sql = format!("UPDATE {} SET token = $1 WHERE id = $2", kind.table());
        sqlx::query(&sql)
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_account_deleted(
        &self,
        kind: AccountKind,
        id: i64,
        is_deleted: bool,
    ) -> Result<bool, RepositoryError> {
        let sql = format!(
            "UPDATE {} SET is_deleted = $1, updated_at = NOW() WHERE id = $2",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(is_deleted)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_account_active(
        &self,
        kind: AccountKind,
        id: i64,
        is_active: bool,
    ) -> Result<bool, RepositoryError> {
        let sql = format!(
            "UPDATE {} SET is_active = $1, updated_at = NOW() WHERE id = $2",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn superadmin_exists(&self) -> Result<bool, RepositoryError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM admins \
             WHERE is_superadmin = TRUE AND is_deleted = FALSE AND is_active = TRUE)",
        )
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_superadmins(&self) -> Result<Vec<i64>, RepositoryError> {
        Ok(sqlx::query_scalar::<_, i64>(
            "DELETE FROM admins WHERE is_superadmin = TRUE RETURNING id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_session(&self, session: &Session) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (id, account_kind, account_id, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session.id)
        .bind(session.kind.as_str())
        .bind(session.account_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, RepositoryError> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT id, account_kind, account_id, created_at, expires_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Session::try_from)
        .transpose()
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_sessions_for(
        &self,
        kind: AccountKind,
        account_id: i64,
    ) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM sessions WHERE account_kind = $1 AND account_id = $2")
                .bind(kind.as_str())
                .bind(account_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn insert_taxon(
        &self,
        level: Level,
        request: &TaxonRequest,
    ) -> Result<Taxon, RepositoryError> {
        let columns = taxon_columns(level);
        let taxon = match level.parent_column() {
            Some(parent) => {
                let sql = format!(
                    "INSERT INTO {} (name_lt, name_ru, is_deleted, {parent}) \
                     VALUES ($1, $2, $3, $4) RETURNING {columns}",
                    level.plural()
                );
                sqlx::query_as::<_, Taxon>(&sql)
                    .bind(&request.name_lt)
                    .bind(&request.name_ru)
                    .bind(request.is_deleted)
                    .bind(request.parent_id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "INSERT INTO {} (name_lt, name_ru, is_deleted) \
                     VALUES ($1, $2, $3) RETURNING {columns}",
                    level.plural()
                );
                sqlx::query_as::<_, Taxon>(&sql)
                    .bind(&request.name_lt)
                    .bind(&request.name_ru)
                    .bind(request.is_deleted)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(taxon)
    }

    async fn update_taxon(
        &self,
        level: Level,
        id: i64,
        request: &TaxonRequest,
    ) -> Result<bool, RepositoryError> {
        let result = match level.parent_column() {
            Some(parent) => {
                let sql = format!(
                    "UPDATE {} SET name_lt = $1, name_ru = $2, is_deleted = $3, {parent} = $4 \
                     WHERE id = $5",
                    level.plural()
                );
                sqlx::query(&sql)
                    .bind(&request.name_lt)
                    .bind(&request.name_ru)
                    .bind(request.is_deleted)
                    .bind(request.parent_id)
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "UPDATE {} SET name_lt = $1, name_ru = $2, is_deleted = $3 WHERE id = $4",
                    level.plural()
                );
                sqlx::query(&sql)
                    .bind(&request.name_lt)
                    .bind(&request.name_ru)
                    .bind(request.is_deleted)
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    async fn set_taxon_deleted(
        &self,
        level: Level,
        id: i64,
        is_deleted: bool,
    ) -> Result<bool, RepositoryError> {
        let sql = format!("UPDATE {} SET is_deleted = $1 WHERE id = $2", level.plural());
        let result = sqlx::query(&sql)
            .bind(is_deleted)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_taxon(&self, level: Level, id: i64) -> Result<bool, RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", level.plural());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_taxon(&self, level: Level, id: i64) -> Result<Option<Taxon>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 AND is_deleted = FALSE",
            taxon_columns(level),
            level.plural()
        );
        Ok(sqlx::query_as::<_, Taxon>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_taxa(&self, level: Level) -> Result<Vec<Taxon>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE is_deleted = FALSE ORDER BY id DESC",
            taxon_columns(level),
            level.plural()
        );
        Ok(sqlx::query_as::<_, Taxon>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_children(
        &self,
        level: Level,
        parent_ids: &[i64],
    ) -> Result<Vec<Taxon>, RepositoryError> {
        // The root has no parent column, so it never appears as somebody's children.
        let Some(parent) = level.parent_column() else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE {parent} = ANY($1) ORDER BY id ASC",
            taxon_columns(level),
            level.plural()
        );
        Ok(sqlx::query_as::<_, Taxon>(&sql)
            .bind(parent_ids)
            .fetch_all(&self.pool)
            .await?)
    }
}
