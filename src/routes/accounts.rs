use crate::{AppState, handlers, models::AccountKind};
use axum::{
    Extension, Router,
    routing::{get, post, put},
};

/// Account Router Module
///
/// The same six handlers serve both credential tables. Each kind gets its own router
/// carrying the kind as an `Extension`, and the routers are merged.
pub fn account_routes() -> Router<AppState> {
    AccountKind::ALL
        .into_iter()
        .fold(Router::new(), |router, kind| router.merge(kind_routes(kind)))
        // POST /api/create-superadmin
        // Open while no superadmin exists, superadmin-only afterwards.
        .route("/api/create-superadmin", post(handlers::create_superadmin))
}

fn kind_routes(kind: AccountKind) -> Router<AppState> {
    let name = kind.as_str();
    Router::new()
        .route(&format!("/api/create-{name}"), post(handlers::create_account))
        .route(&format!("/api/update-{name}/{{id}}"), put(handlers::update_account))
        .route(&format!("/api/get-admin-{name}s"), get(handlers::list_accounts))
        .route(&format!("/api/get-admin-{name}/{{id}}"), get(handlers::get_account))
        // Soft delete: the body carries `is_deleted`.
        .route(&format!("/api/delete-{name}/{{id}}"), put(handlers::delete_account))
        .route(&format!("/api/activate-{name}/{{id}}"), put(handlers::activate_account))
        .layer(Extension(kind))
}
