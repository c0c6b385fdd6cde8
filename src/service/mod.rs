//! The CRUD service: every operation starts with an authorization gate check and
//! ends in a single store call (or a short sequence of independent commits).

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::TokenService,
    error::ServiceError,
    models::{AccountKind, Session},
    repository::RepositoryState,
};

mod accounts;
mod gate;
mod taxonomy;

pub use accounts::{hash_password, validate_credentials, verify_password};
pub use gate::{Principal, Role};

/// TaxonomyService
///
/// Owns the store handle and the token service. Cheap to clone.
#[derive(Clone)]
pub struct TaxonomyService {
    repo: RepositoryState,
    tokens: TokenService,
}

/// ServiceState
///
/// The shared handle placed in the application state.
pub type ServiceState = Arc<TaxonomyService>;

impl TaxonomyService {
    pub fn new(repo: RepositoryState, tokens: TokenService) -> Self {
        Self { repo, tokens }
    }

    /// open_session
    ///
    /// Records a new session for the account, signs a token naming it and stores that
    /// token on the account row as its most recent one.
    async fn open_session(&self, kind: AccountKind, account_id: i64) -> Result<String, ServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            kind,
            account_id,
            created_at: now,
            expires_at: now + self.tokens.ttl(),
        };
        self.repo.insert_session(&session).await?;
        let token = self.tokens.issue(&session)?;
        self.repo.set_account_token(kind, account_id, &token).await?;
        Ok(token)
    }

    /// Drops every session of an account so its outstanding tokens stop resolving.
    async fn revoke_sessions(&self, kind: AccountKind, account_id: i64) -> Result<(), ServiceError> {
        let revoked = self.repo.delete_sessions_for(kind, account_id).await?;
        if revoked > 0 {
            tracing::info!(kind = kind.as_str(), account_id, revoked, "sessions revoked");
        }
        Ok(())
    }
}
