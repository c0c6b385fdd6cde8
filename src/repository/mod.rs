use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::RepositoryError,
    models::{Account, AccountKind, Level, NewAccount, Session, Taxon, TaxonRequest},
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The persistence contract behind the credential store, the session table and the
/// hierarchy store. Every mutation commits immediately; nothing spans statements.
///
/// "Live" below means `is_deleted = false`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---

    /// Live account with this exact username (active or not).
    async fn find_account_by_username(
        &self,
        kind: AccountKind,
        username: &str,
    ) -> Result<Option<Account>, RepositoryError>;
    /// Account by id, soft-deleted or not.
    async fn get_account_row(
        &self,
        kind: AccountKind,
        id: i64,
    ) -> Result<Option<Account>, RepositoryError>;
    /// Live account by id.
    async fn get_account(&self, kind: AccountKind, id: i64)
    -> Result<Option<Account>, RepositoryError>;
    /// Live accounts, id descending.
    async fn list_accounts(&self, kind: AccountKind) -> Result<Vec<Account>, RepositoryError>;
    async fn insert_account(
        &self,
        kind: AccountKind,
        account: NewAccount,
    ) -> Result<Account, RepositoryError>;
    /// Overwrites username and password hash. Returns false if no row matched.
    async fn update_credentials(
        &self,
        kind: AccountKind,
        id: i64,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, RepositoryError>;
    async fn set_account_token(
        &self,
        kind: AccountKind,
        id: i64,
        token: &str,
    ) -> Result<(), RepositoryError>;
    async fn set_account_deleted(
        &self,
        kind: AccountKind,
        id: i64,
        is_deleted: bool,
    ) -> Result<bool, RepositoryError>;
    async fn set_account_active(
        &self,
        kind: AccountKind,
        id: i64,
        is_active: bool,
    ) -> Result<bool, RepositoryError>;
    /// True when a live, active superadmin exists, i.e. one that can still log in.
    async fn superadmin_exists(&self) -> Result<bool, RepositoryError>;
    /// Physically removes every superadmin row and returns the removed ids.
    async fn delete_superadmins(&self) -> Result<Vec<i64>, RepositoryError>;

    // --- Sessions ---

    async fn insert_session(&self, session: &Session) -> Result<(), RepositoryError>;
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, RepositoryError>;
    async fn delete_session(&self, id: Uuid) -> Result<bool, RepositoryError>;
    /// Revokes every session of one account. Returns how many were removed.
    async fn delete_sessions_for(
        &self,
        kind: AccountKind,
        account_id: i64,
    ) -> Result<u64, RepositoryError>;

    // --- Hierarchy Store ---

    async fn insert_taxon(
        &self,
        level: Level,
        request: &TaxonRequest,
    ) -> Result<Taxon, RepositoryError>;
    /// Full-field overwrite. Returns false if no row matched.
    async fn update_taxon(
        &self,
        level: Level,
        id: i64,
        request: &TaxonRequest,
    ) -> Result<bool, RepositoryError>;
    async fn set_taxon_deleted(
        &self,
        level: Level,
        id: i64,
        is_deleted: bool,
    ) -> Result<bool, RepositoryError>;
    /// Physical removal. Only departments are ever removed this way.
    async fn delete_taxon(&self, level: Level, id: i64) -> Result<bool, RepositoryError>;
    /// Live taxon by id.
    async fn get_taxon(&self, level: Level, id: i64) -> Result<Option<Taxon>, RepositoryError>;
    /// Live taxa of one level, id descending.
    async fn list_taxa(&self, level: Level) -> Result<Vec<Taxon>, RepositoryError>;
    /// Taxa of `level` whose parent is one of `parent_ids`, id ascending. Soft-deleted
    /// children are included; they carry their own `is_deleted` flag.
    async fn list_children(
        &self,
        level: Level,
        parent_ids: &[i64],
    ) -> Result<Vec<Taxon>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application.
pub type RepositoryState = Arc<dyn Repository>;
