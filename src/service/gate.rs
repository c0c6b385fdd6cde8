use chrono::Utc;
use uuid::Uuid;

use super::TaxonomyService;
use crate::{
    error::ServiceError,
    models::{Account, AccountKind, LoginRequest, LoginResponse},
};

/// Role
///
/// The privilege an operation demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Any live, active admin (superadmins included).
    Admin,
    /// The single admin row flagged `is_superadmin`.
    Superadmin,
}

/// Principal
///
/// The identity a bearer token resolved to.
#[derive(Debug, Clone)]
pub struct Principal {
    pub kind: AccountKind,
    pub session_id: Uuid,
    pub account: Account,
}

impl Principal {
    pub fn satisfies(&self, role: Role) -> bool {
        match role {
            Role::Admin => self.kind == AccountKind::Admin,
            Role::Superadmin => self.kind == AccountKind::Admin && self.account.is_superadmin,
        }
    }
}

impl TaxonomyService {
    /// resolve
    ///
    /// token → claims → session row → account row. Fails with `Unauthorized` when any link
    /// is missing: no token, bad signature, expired, revoked session, or an account that is
    /// deleted or inactive.
    pub async fn resolve(&self, token: Option<&str>) -> Result<Principal, ServiceError> {
        let token = token.ok_or(ServiceError::Unauthorized)?;

        let claims = self.tokens.validate(token).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            ServiceError::Unauthorized
        })?;

        let session = self
            .repo
            .get_session(claims.sub)
            .await?
            .filter(|s| s.kind == claims.kind && s.expires_at > Utc::now())
            .ok_or(ServiceError::Unauthorized)?;

        let account = self
            .repo
            .get_account(session.kind, session.account_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or_else(|| {
                tracing::debug!(session = %session.id, "session owner is deleted or inactive");
                ServiceError::Unauthorized
            })?;

        Ok(Principal {
            kind: session.kind,
            session_id: session.id,
            account,
        })
    }

    /// Resolves the token and checks the resolved principal holds `role`.
    pub async fn authorize(&self, token: Option<&str>, role: Role) -> Result<Principal, ServiceError> {
        let principal = self.resolve(token).await?;
        if principal.satisfies(role) {
            Ok(principal)
        } else {
            tracing::debug!(
                account_id = principal.account.id,
                kind = principal.kind.as_str(),
                ?role,
                "insufficient role"
            );
            Err(ServiceError::Unauthorized)
        }
    }

    pub async fn require_admin(&self, token: Option<&str>) -> Result<Principal, ServiceError> {
        self.authorize(token, Role::Admin).await
    }

    pub async fn require_superadmin(&self, token: Option<&str>) -> Result<Principal, ServiceError> {
        self.authorize(token, Role::Superadmin).await
    }

    /// login
    ///
    /// Checks the credentials against a live, active row and opens a new session.
    pub async fn login(
        &self,
        kind: AccountKind,
        request: LoginRequest,
    ) -> Result<LoginResponse, ServiceError> {
        let account = self
            .repo
            .find_account_by_username(kind, &request.username)
            .await?
            .filter(|a| a.is_active)
            .filter(|a| super::verify_password(&request.password, &a.password_hash))
            .ok_or_else(|| {
                tracing::info!(kind = kind.as_str(), username = %request.username, "login rejected");
                ServiceError::Unauthorized
            })?;

        let token = self.open_session(kind, account.id).await?;
        tracing::info!(kind = kind.as_str(), account_id = account.id, "login succeeded");

        Ok(LoginResponse {
            id: account.id,
            username: account.username,
            token,
            is_superadmin: account.is_superadmin,
        })
    }

    /// logout
    ///
    /// Deletes the session the token names. Any admin or user token is accepted.
    pub async fn logout(&self, token: Option<&str>) -> Result<(), ServiceError> {
        let principal = self.resolve(token).await?;
        self.repo.delete_session(principal.session_id).await?;
        tracing::info!(
            kind = principal.kind.as_str(),
            account_id = principal.account.id,
            "logged out"
        );
        Ok(())
    }
}
