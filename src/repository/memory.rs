use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::{
    error::RepositoryError,
    models::{Account, AccountKind, Level, NewAccount, Session, Taxon, TaxonRequest},
};

/// MemoryRepository
///
/// In-process implementation of the `Repository` trait. It enforces the same live-username
/// uniqueness, single-superadmin and foreign-key constraints as the Postgres schema, so the
/// service layer behaves identically on top of either store.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<AccountKind, BTreeMap<i64, Account>>,
    sessions: HashMap<Uuid, Session>,
    taxa: HashMap<Level, BTreeMap<i64, Taxon>>,
    // Last id handed out per table; ids are never reused, like BIGSERIAL.
    account_seq: HashMap<AccountKind, i64>,
    taxon_seq: HashMap<Level, i64>,
}

impl MemoryState {
    fn accounts(&self, kind: AccountKind) -> impl DoubleEndedIterator<Item = &Account> {
        self.accounts.get(&kind).into_iter().flat_map(|rows| rows.values())
    }

    fn account_mut(&mut self, kind: AccountKind, id: i64) -> Option<&mut Account> {
        self.accounts.get_mut(&kind).and_then(|rows| rows.get_mut(&id))
    }

    fn taxon_mut(&mut self, level: Level, id: i64) -> Option<&mut Taxon> {
        self.taxa.get_mut(&level).and_then(|rows| rows.get_mut(&id))
    }

    fn username_taken(&self, kind: AccountKind, username: &str, except: Option<i64>) -> bool {
        self.accounts(kind)
            .any(|a| !a.is_deleted && a.username == username && Some(a.id) != except)
    }

    /// Mirrors the `REFERENCES` clause of every non-root hierarchy table.
    fn check_parent(&self, level: Level, parent_id: Option<i64>) -> Result<(), RepositoryError> {
        let Some(parent) = level.parent() else {
            return Ok(());
        };
        let exists = parent_id
            .and_then(|id| self.taxa.get(&parent).and_then(|rows| rows.get(&id)))
            .is_some();
        if exists {
            Ok(())
        } else {
            Err(RepositoryError::Constraint(format!(
                "{} references missing {} {:?}",
                level.slug(),
                parent.slug(),
                parent_id
            )))
        }
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a taxon regardless of its `is_deleted` flag.
    pub async fn stored_taxon(&self, level: Level, id: i64) -> Option<Taxon> {
        let state = self.state.read().await;
        state.taxa.get(&level).and_then(|rows| rows.get(&id)).cloned()
    }

    /// Reads an account regardless of its `is_deleted` flag.
    pub async fn stored_account(&self, kind: AccountKind, id: i64) -> Option<Account> {
        let state = self.state.read().await;
        state.accounts.get(&kind).and_then(|rows| rows.get(&id)).cloned()
    }

    /// Number of rows in a credential table, deleted ones included.
    pub async fn account_count(&self, kind: AccountKind) -> usize {
        self.state.read().await.accounts(kind).count()
    }

    /// Number of open sessions.
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_account_by_username(
        &self,
        kind: AccountKind,
        username: &str,
    ) -> Result<Option<Account>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .accounts(kind)
            .find(|a| !a.is_deleted && a.username == username)
            .cloned())
    }

    async fn get_account_row(
        &self,
        kind: AccountKind,
        id: i64,
    ) -> Result<Option<Account>, RepositoryError> {
        Ok(self.stored_account(kind, id).await)
    }

    async fn get_account(
        &self,
        kind: AccountKind,
        id: i64,
    ) -> Result<Option<Account>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .accounts(kind)
            .find(|a| a.id == id && !a.is_deleted)
            .cloned())
    }

    async fn list_accounts(&self, kind: AccountKind) -> Result<Vec<Account>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .accounts(kind)
            .rev()
            .filter(|a| !a.is_deleted)
            .cloned()
            .collect())
    }

    async fn insert_account(
        &self,
        kind: AccountKind,
        account: NewAccount,
    ) -> Result<Account, RepositoryError> {
        let mut state = self.state.write().await;
        if state.username_taken(kind, &account.username, None) {
            return Err(RepositoryError::Constraint(format!(
                "{} username '{}' already exists",
                kind.as_str(),
                account.username
            )));
        }
        let is_superadmin = kind == AccountKind::Admin && account.is_superadmin;
        if is_superadmin && state.accounts(kind).any(|a| a.is_superadmin) {
            return Err(RepositoryError::Constraint(
                "a superadmin already exists".to_string(),
            ));
        }

        let seq = state.account_seq.entry(kind).or_default();
        *seq += 1;
        let now = Utc::now();
        let created = Account {
            id: *seq,
            username: account.username,
            password_hash: account.password_hash,
            token: None,
            is_active: true,
            is_superadmin,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        state
            .accounts
            .entry(kind)
            .or_default()
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_credentials(
        &self,
        kind: AccountKind,
        id: i64,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let target_is_live = state
            .accounts(kind)
            .any(|a| a.id == id && !a.is_deleted);
        if target_is_live && state.username_taken(kind, username, Some(id)) {
            return Err(RepositoryError::Constraint(format!(
                "{} username '{}' already exists",
                kind.as_str(),
                username
            )));
        }
        match state.account_mut(kind, id) {
            Some(account) => {
                account.username = username.to_string();
                account.password_hash = password_hash.to_string();
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_account_token(
        &self,
        kind: AccountKind,
        id: i64,
        token: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(account) = state.account_mut(kind, id) {
            account.token = Some(token.to_string());
        }
        Ok(())
    }

    async fn set_account_deleted(
        &self,
        kind: AccountKind,
        id: i64,
        is_deleted: bool,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if !is_deleted {
            let restored = state.accounts(kind).find(|a| a.id == id).cloned();
            if let Some(restored) = restored {
                if restored.is_deleted && state.username_taken(kind, &restored.username, Some(id)) {
                    return Err(RepositoryError::Constraint(format!(
                        "{} username '{}' already exists",
                        kind.as_str(),
                        restored.username
                    )));
                }
            }
        }
        match state.account_mut(kind, id) {
            Some(account) => {
                account.is_deleted = is_deleted;
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_account_active(
        &self,
        kind: AccountKind,
        id: i64,
        is_active: bool,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        match state.account_mut(kind, id) {
            Some(account) => {
                account.is_active = is_active;
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn superadmin_exists(&self) -> Result<bool, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .accounts(AccountKind::Admin)
            .any(|a| a.is_superadmin && !a.is_deleted && a.is_active))
    }

    async fn delete_superadmins(&self) -> Result<Vec<i64>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(admins) = state.accounts.get_mut(&AccountKind::Admin) else {
            return Ok(Vec::new());
        };
        let removed: Vec<i64> = admins
            .values()
            .filter(|a| a.is_superadmin)
            .map(|a| a.id)
            .collect();
        for id in &removed {
            admins.remove(id);
        }
        Ok(removed)
    }

    async fn insert_session(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, RepositoryError> {
        Ok(self.state.read().await.sessions.get(&id).cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.state.write().await.sessions.remove(&id).is_some())
    }

    async fn delete_sessions_for(
        &self,
        kind: AccountKind,
        account_id: i64,
    ) -> Result<u64, RepositoryError> {
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state
            .sessions
            .retain(|_, s| !(s.kind == kind && s.account_id == account_id));
        Ok((before - state.sessions.len()) as u64)
    }

    async fn insert_taxon(
        &self,
        level: Level,
        request: &TaxonRequest,
    ) -> Result<Taxon, RepositoryError> {
        let mut state = self.state.write().await;
        state.check_parent(level, request.parent_id)?;

        let seq = state.taxon_seq.entry(level).or_default();
        *seq += 1;
        let taxon = Taxon {
            id: *seq,
            name_lt: request.name_lt.clone(),
            name_ru: request.name_ru.clone(),
            parent_id: level.parent().and(request.parent_id),
            is_deleted: request.is_deleted,
        };
        state
            .taxa
            .entry(level)
            .or_default()
            .insert(taxon.id, taxon.clone());
        Ok(taxon)
    }

    async fn update_taxon(
        &self,
        level: Level,
        id: i64,
        request: &TaxonRequest,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if state.taxon_mut(level, id).is_none() {
            return Ok(false);
        }
        state.check_parent(level, request.parent_id)?;
        let Some(taxon) = state.taxon_mut(level, id) else {
            return Ok(false);
        };
        taxon.name_lt = request.name_lt.clone();
        taxon.name_ru = request.name_ru.clone();
        taxon.parent_id = level.parent().and(request.parent_id);
        taxon.is_deleted = request.is_deleted;
        Ok(true)
    }

    async fn set_taxon_deleted(
        &self,
        level: Level,
        id: i64,
        is_deleted: bool,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        match state.taxon_mut(level, id) {
            Some(taxon) => {
                taxon.is_deleted = is_deleted;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_taxon(&self, level: Level, id: i64) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(child) = level.child() {
            let referenced = state
                .taxa
                .get(&child)
                .is_some_and(|rows| rows.values().any(|t| t.parent_id == Some(id)));
            if referenced {
                return Err(RepositoryError::Constraint(format!(
                    "{} {} is still referenced by {}",
                    level.slug(),
                    id,
                    child.plural()
                )));
            }
        }
        Ok(state
            .taxa
            .get_mut(&level)
            .is_some_and(|rows| rows.remove(&id).is_some()))
    }

    async fn get_taxon(&self, level: Level, id: i64) -> Result<Option<Taxon>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .taxa
            .get(&level)
            .and_then(|rows| rows.get(&id))
            .filter(|t| !t.is_deleted)
            .cloned())
    }

    async fn list_taxa(&self, level: Level) -> Result<Vec<Taxon>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .taxa
            .get(&level)
            .map(|rows| {
                rows.values()
                    .rev()
                    .filter(|t| !t.is_deleted)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_children(
        &self,
        level: Level,
        parent_ids: &[i64],
    ) -> Result<Vec<Taxon>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .taxa
            .get(&level)
            .map(|rows| {
                rows.values()
                    .filter(|t| t.parent_id.is_some_and(|p| parent_ids.contains(&p)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
