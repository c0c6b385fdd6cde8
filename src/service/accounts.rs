use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use super::TaxonomyService;
use crate::{
    error::ServiceError,
    models::{Account, AccountKind, AccountRequest, NewAccount, Updated},
};

/// Rejects empty or space-containing usernames and passwords.
pub fn validate_credentials(request: &AccountRequest) -> Result<(), ServiceError> {
    let acceptable = |value: &str| !value.is_empty() && !value.contains(' ');
    if acceptable(&request.username) && acceptable(&request.password) {
        Ok(())
    } else {
        Err(ServiceError::NotFound)
    }
}

/// Hashes a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Credential(e.to_string()))
}

/// True when `password` matches the stored PHC string. A corrupt hash never matches.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

impl TaxonomyService {
    /// create_account
    ///
    /// Superadmin only. Validates, checks live-username uniqueness, inserts, then opens a
    /// first session for the new account so its row carries a usable token.
    pub async fn create_account(
        &self,
        kind: AccountKind,
        token: Option<&str>,
        request: AccountRequest,
    ) -> Result<Account, ServiceError> {
        self.require_superadmin(token).await?;
        validate_credentials(&request)?;

        if self
            .repo
            .find_account_by_username(kind, &request.username)
            .await?
            .is_some()
        {
            return Err(ServiceError::Duplicate);
        }

        let created = self
            .repo
            .insert_account(
                kind,
                NewAccount {
                    username: request.username,
                    password_hash: hash_password(&request.password)?,
                    is_superadmin: false,
                },
            )
            .await?;
        let token = self.open_session(kind, created.id).await?;
        tracing::info!(kind = kind.as_str(), account_id = created.id, "account created");

        Ok(Account {
            token: Some(token),
            ..created
        })
    }

    /// create_superadmin
    ///
    /// Replaces the superadmin. Without an existing superadmin the call is open (bootstrap);
    /// otherwise it needs the current superadmin's token. Existing superadmin rows are
    /// physically deleted before the insert, in a separate commit.
    pub async fn create_superadmin(
        &self,
        token: Option<&str>,
        request: AccountRequest,
    ) -> Result<Account, ServiceError> {
        if self.repo.superadmin_exists().await? {
            self.require_superadmin(token).await?;
        }
        self.install_superadmin(request).await
    }

    /// bootstrap_superadmin
    ///
    /// Startup hook: installs the configured superadmin only when none exists.
    /// Returns `None` when a superadmin was already present.
    pub async fn bootstrap_superadmin(
        &self,
        request: AccountRequest,
    ) -> Result<Option<Account>, ServiceError> {
        if self.repo.superadmin_exists().await? {
            return Ok(None);
        }
        self.install_superadmin(request).await.map(Some)
    }

    async fn install_superadmin(&self, request: AccountRequest) -> Result<Account, ServiceError> {
        validate_credentials(&request)?;

        // A regular admin holding the name would collide with the new row.
        if let Some(existing) = self
            .repo
            .find_account_by_username(AccountKind::Admin, &request.username)
            .await?
        {
            if !existing.is_superadmin {
                return Err(ServiceError::Duplicate);
            }
        }
        let password_hash = hash_password(&request.password)?;

        let removed = self.repo.delete_superadmins().await?;
        for id in &removed {
            self.revoke_sessions(AccountKind::Admin, *id).await?;
        }
        if !removed.is_empty() {
            tracing::warn!(
                removed = ?removed,
                "superadmin removed; no superadmin exists until the replacement is inserted"
            );
        }

        let created = self
            .repo
            .insert_account(
                AccountKind::Admin,
                NewAccount {
                    username: request.username,
                    password_hash,
                    is_superadmin: true,
                },
            )
            .await?;
        let token = self.open_session(AccountKind::Admin, created.id).await?;
        tracing::info!(account_id = created.id, "superadmin installed");

        Ok(Account {
            token: Some(token),
            ..created
        })
    }

    /// update_account
    ///
    /// Superadmin only. Full overwrite of username and password. The new username may equal
    /// the row's own, but not another live row's. Old sessions are revoked and a fresh token
    /// is stored on the row.
    pub async fn update_account(
        &self,
        kind: AccountKind,
        id: i64,
        token: Option<&str>,
        request: AccountRequest,
    ) -> Result<Updated, ServiceError> {
        self.require_superadmin(token).await?;
        validate_credentials(&request)?;

        if let Some(holder) = self
            .repo
            .find_account_by_username(kind, &request.username)
            .await?
        {
            if holder.id != id {
                return Err(ServiceError::Duplicate);
            }
        }

        let password_hash = hash_password(&request.password)?;
        if !self
            .repo
            .update_credentials(kind, id, &request.username, &password_hash)
            .await?
        {
            return Err(ServiceError::NotFound);
        }

        self.revoke_sessions(kind, id).await?;
        self.open_session(kind, id).await?;
        tracing::info!(kind = kind.as_str(), account_id = id, "account updated");

        Ok(Updated { updated: true })
    }

    /// Superadmin only. Live accounts, id descending.
    pub async fn list_accounts(
        &self,
        kind: AccountKind,
        token: Option<&str>,
    ) -> Result<Vec<Account>, ServiceError> {
        self.require_superadmin(token).await?;
        Ok(self.repo.list_accounts(kind).await?)
    }

    /// Superadmin only.
    pub async fn get_account(
        &self,
        kind: AccountKind,
        id: i64,
        token: Option<&str>,
    ) -> Result<Account, ServiceError> {
        self.require_superadmin(token).await?;
        self.repo
            .get_account(kind, id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// set_account_deleted
    ///
    /// Superadmin only. Flips the soft-delete flag; deleting also revokes the account's
    /// sessions. Restoring a row whose username a live row now holds is a `Duplicate`.
    pub async fn set_account_deleted(
        &self,
        kind: AccountKind,
        id: i64,
        token: Option<&str>,
        is_deleted: bool,
    ) -> Result<bool, ServiceError> {
        self.require_superadmin(token).await?;

        // Restoring must not revive a username a live row has taken since.
        if !is_deleted {
            let row = self
                .repo
                .get_account_row(kind, id)
                .await?
                .ok_or(ServiceError::NotFound)?;
            if row.is_deleted {
                if let Some(holder) = self
                    .repo
                    .find_account_by_username(kind, &row.username)
                    .await?
                {
                    if holder.id != id {
                        return Err(ServiceError::Duplicate);
                    }
                }
            }
        }

        if !self.repo.set_account_deleted(kind, id, is_deleted).await? {
            return Err(ServiceError::NotFound);
        }
        if is_deleted {
            self.revoke_sessions(kind, id).await?;
        }
        tracing::info!(kind = kind.as_str(), account_id = id, is_deleted, "account delete flag set");
        Ok(is_deleted)
    }

    /// set_account_active
    ///
    /// Superadmin only. Deactivating also revokes the account's sessions.
    pub async fn set_account_active(
        &self,
        kind: AccountKind,
        id: i64,
        token: Option<&str>,
        is_active: bool,
    ) -> Result<bool, ServiceError> {
        self.require_superadmin(token).await?;
        if !self.repo.set_account_active(kind, id, is_active).await? {
            return Err(ServiceError::NotFound);
        }
        if !is_active {
            self.revoke_sessions(kind, id).await?;
        }
        tracing::info!(kind = kind.as_str(), account_id = id, is_active, "account active flag set");
        Ok(is_active)
    }
}
