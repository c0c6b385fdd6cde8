use crate::{AppState, handlers, models::AccountKind};
use axum::{
    Extension, Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a bearer token. Logout lives here too: it accepts any
/// admin or user token and checks it itself.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/admin-login
        .route(
            "/api/admin-login",
            post(handlers::login).layer(Extension(AccountKind::Admin)),
        )
        // POST /api/user-login
        .route(
            "/api/user-login",
            post(handlers::login).layer(Extension(AccountKind::User)),
        )
        // POST /api/logout
        .route("/api/logout", post(handlers::logout))
}
