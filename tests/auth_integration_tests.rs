use axum::{
    extract::FromRequestParts,
    http::{Request, header},
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use taxonomy_backend::{
    MemoryRepository, ServiceError, TaxonomyService,
    auth::{BearerToken, TokenError, TokenService},
    models::{AccountKind, AccountRequest, LoginRequest, Session},
    repository::RepositoryState,
};
use uuid::Uuid;

const SECRET: &str = "auth-test-secret";

// --- Helpers ---

fn service_with_ttl(repo: Arc<MemoryRepository>, ttl: Duration) -> TaxonomyService {
    TaxonomyService::new(repo as RepositoryState, TokenService::new(SECRET, ttl))
}

fn credentials(username: &str, password: &str) -> AccountRequest {
    AccountRequest {
        username: username.to_string(),
        password: password.to_string(),
    }
}

/// Installs a superadmin and one plain admin; returns (superadmin token, admin id, admin token).
async fn seed_admins(service: &TaxonomyService) -> (String, i64, String) {
    let root = service
        .create_superadmin(None, credentials("root", "rootpass"))
        .await
        .expect("bootstrap superadmin");
    let root_token = root.token.expect("superadmin carries a token");

    let admin = service
        .create_account(
            AccountKind::Admin,
            Some(&root_token),
            credentials("curator", "curpass"),
        )
        .await
        .expect("create admin");
    let admin_token = admin.token.clone().expect("admin carries a token");
    (root_token, admin.id, admin_token)
}

fn session(kind: AccountKind, ttl: Duration) -> Session {
    let now = Utc::now();
    Session {
        id: Uuid::new_v4(),
        kind,
        account_id: 1,
        created_at: now,
        expires_at: now + ttl,
    }
}

// --- TokenService ---

#[test]
fn test_token_round_trip_names_the_session() {
    let tokens = TokenService::new(SECRET, Duration::minutes(5));
    let session = session(AccountKind::Admin, Duration::minutes(5));

    let token = tokens.issue(&session).unwrap();
    let claims = tokens.validate(&token).unwrap();

    assert_eq!(claims.sub, session.id);
    assert_eq!(claims.kind, AccountKind::Admin);
    assert_eq!(claims.exp as i64, session.expires_at.timestamp());
}

#[test]
fn test_expired_token_is_rejected() {
    let tokens = TokenService::new(SECRET, Duration::minutes(-5));
    let token = tokens
        .issue(&session(AccountKind::Admin, Duration::minutes(-5)))
        .unwrap();

    assert!(matches!(tokens.validate(&token), Err(TokenError::Expired)));
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let forger = TokenService::new("another-secret", Duration::minutes(5));
    let token = forger
        .issue(&session(AccountKind::Admin, Duration::minutes(5)))
        .unwrap();

    let tokens = TokenService::new(SECRET, Duration::minutes(5));
    assert!(matches!(tokens.validate(&token), Err(TokenError::Invalid)));
}

#[test]
fn test_garbage_token_is_rejected() {
    let tokens = TokenService::new(SECRET, Duration::minutes(5));
    assert!(matches!(
        tokens.validate("not.a.token"),
        Err(TokenError::Invalid)
    ));
}

// --- BearerToken extractor ---

#[tokio::test]
async fn test_bearer_token_extraction() {
    let (mut parts, _) = Request::builder()
        .header(header::AUTHORIZATION, "Bearer abc.def.ghi")
        .body(())
        .unwrap()
        .into_parts();
    let token = BearerToken::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(token.as_deref(), Some("abc.def.ghi"));
}

#[tokio::test]
async fn test_missing_or_malformed_header_yields_none() {
    let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
    let token = BearerToken::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(token.as_deref(), None);

    let (mut parts, _) = Request::builder()
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(())
        .unwrap()
        .into_parts();
    let token = BearerToken::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(token.as_deref(), None);
}

// --- Authorization gate ---

#[tokio::test]
async fn test_require_admin_accepts_live_admin() {
    let repo = Arc::new(MemoryRepository::new());
    let service = service_with_ttl(repo, Duration::minutes(30));
    let (_, admin_id, admin_token) = seed_admins(&service).await;

    let principal = service.require_admin(Some(&admin_token)).await.unwrap();
    assert_eq!(principal.account.id, admin_id);
    assert!(!principal.account.is_superadmin);
}

#[tokio::test]
async fn test_require_admin_rejects_missing_and_tampered_tokens() {
    let repo = Arc::new(MemoryRepository::new());
    let service = service_with_ttl(repo, Duration::minutes(30));
    let (_, _, admin_token) = seed_admins(&service).await;

    assert!(matches!(
        service.require_admin(None).await,
        Err(ServiceError::Unauthorized)
    ));

    let mut tampered = admin_token.clone();
    tampered.push('x');
    assert!(matches!(
        service.require_admin(Some(&tampered)).await,
        Err(ServiceError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_expired_session_is_unauthorized() {
    let repo = Arc::new(MemoryRepository::new());
    let bootstrap = service_with_ttl(repo.clone(), Duration::minutes(30));
    bootstrap
        .create_superadmin(None, credentials("root", "rootpass"))
        .await
        .unwrap();

    // Same store, but every new session is born expired.
    let short_lived = service_with_ttl(repo, Duration::minutes(-1));
    let login = short_lived
        .login(
            AccountKind::Admin,
            LoginRequest {
                username: "root".to_string(),
                password: "rootpass".to_string(),
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        short_lived.require_admin(Some(&login.token)).await,
        Err(ServiceError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_superadmin_gate_rejects_plain_admin() {
    let repo = Arc::new(MemoryRepository::new());
    let service = service_with_ttl(repo, Duration::minutes(30));
    let (root_token, _, admin_token) = seed_admins(&service).await;

    assert!(service.require_superadmin(Some(&root_token)).await.is_ok());
    assert!(matches!(
        service.require_superadmin(Some(&admin_token)).await,
        Err(ServiceError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_user_token_is_not_an_admin_token() {
    let repo = Arc::new(MemoryRepository::new());
    let service = service_with_ttl(repo, Duration::minutes(30));
    let (root_token, _, _) = seed_admins(&service).await;

    let user = service
        .create_account(
            AccountKind::User,
            Some(&root_token),
            credentials("reader", "readpass"),
        )
        .await
        .unwrap();
    let user_token = user.token.unwrap();

    // The user's session resolves...
    assert!(service.resolve(Some(&user_token)).await.is_ok());
    // ...but never grants admin access, even though admin id 1 exists too.
    assert!(matches!(
        service.require_admin(Some(&user_token)).await,
        Err(ServiceError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_deleted_or_inactive_admin_is_unauthorized() {
    let repo = Arc::new(MemoryRepository::new());
    let service = service_with_ttl(repo, Duration::minutes(30));
    let (root_token, admin_id, admin_token) = seed_admins(&service).await;

    service
        .set_account_active(AccountKind::Admin, admin_id, Some(&root_token), false)
        .await
        .unwrap();
    assert!(matches!(
        service.require_admin(Some(&admin_token)).await,
        Err(ServiceError::Unauthorized)
    ));

    // Reactivation does not bring the revoked session back; a fresh login does.
    service
        .set_account_active(AccountKind::Admin, admin_id, Some(&root_token), true)
        .await
        .unwrap();
    assert!(service.require_admin(Some(&admin_token)).await.is_err());

    let relogin = service
        .login(
            AccountKind::Admin,
            LoginRequest {
                username: "curator".to_string(),
                password: "curpass".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(service.require_admin(Some(&relogin.token)).await.is_ok());

    service
        .set_account_deleted(AccountKind::Admin, admin_id, Some(&root_token), true)
        .await
        .unwrap();
    assert!(matches!(
        service.require_admin(Some(&relogin.token)).await,
        Err(ServiceError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_credential_change_revokes_old_tokens() {
    let repo = Arc::new(MemoryRepository::new());
    let service = service_with_ttl(repo.clone(), Duration::minutes(30));
    let (root_token, admin_id, admin_token) = seed_admins(&service).await;

    service
        .update_account(
            AccountKind::Admin,
            admin_id,
            Some(&root_token),
            credentials("curator", "newpass"),
        )
        .await
        .unwrap();

    assert!(matches!(
        service.require_admin(Some(&admin_token)).await,
        Err(ServiceError::Unauthorized)
    ));

    // The row now carries a fresh token that does resolve.
    let stored = repo
        .stored_account(AccountKind::Admin, admin_id)
        .await
        .unwrap();
    let fresh = stored.token.unwrap();
    assert_ne!(fresh, admin_token);
    assert!(service.require_admin(Some(&fresh)).await.is_ok());
}

#[tokio::test]
async fn test_login_rejects_wrong_password_and_inactive_account() {
    let repo = Arc::new(MemoryRepository::new());
    let service = service_with_ttl(repo, Duration::minutes(30));
    let (root_token, admin_id, _) = seed_admins(&service).await;

    let wrong = service
        .login(
            AccountKind::Admin,
            LoginRequest {
                username: "curator".to_string(),
                password: "wrong".to_string(),
            },
        )
        .await;
    assert!(matches!(wrong, Err(ServiceError::Unauthorized)));

    // Admin credentials do not log into the users table.
    let cross = service
        .login(
            AccountKind::User,
            LoginRequest {
                username: "curator".to_string(),
                password: "curpass".to_string(),
            },
        )
        .await;
    assert!(matches!(cross, Err(ServiceError::Unauthorized)));

    service
        .set_account_active(AccountKind::Admin, admin_id, Some(&root_token), false)
        .await
        .unwrap();
    let inactive = service
        .login(
            AccountKind::Admin,
            LoginRequest {
                username: "curator".to_string(),
                password: "curpass".to_string(),
            },
        )
        .await;
    assert!(matches!(inactive, Err(ServiceError::Unauthorized)));
}

#[tokio::test]
async fn test_logout_revokes_only_that_session() {
    let repo = Arc::new(MemoryRepository::new());
    let service = service_with_ttl(repo.clone(), Duration::minutes(30));
    let (_, _, first_token) = seed_admins(&service).await;

    let second = service
        .login(
            AccountKind::Admin,
            LoginRequest {
                username: "curator".to_string(),
                password: "curpass".to_string(),
            },
        )
        .await
        .unwrap();

    service.logout(Some(&first_token)).await.unwrap();

    assert!(service.require_admin(Some(&first_token)).await.is_err());
    assert!(service.require_admin(Some(&second.token)).await.is_ok());
    // superadmin + second admin session remain
    assert_eq!(repo.session_count().await, 2);
}
