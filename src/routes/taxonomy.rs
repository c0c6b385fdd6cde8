use crate::{AppState, handlers, models::Level};
use axum::{
    Extension, Router,
    routing::{delete, get, post, put},
};

/// Taxonomy Router Module
///
/// Every level exposes the same CRUD surface. The level travels to the shared handlers as
/// an `Extension`, so adding a rank to `Level` is enough to route it.
pub fn taxonomy_routes() -> Router<AppState> {
    Level::ALL
        .into_iter()
        .fold(Router::new(), |router, level| router.merge(level_routes(level)))
}

fn level_routes(level: Level) -> Router<AppState> {
    let slug = level.slug();
    let plural = level.plural();

    let router = Router::new()
        .route(&format!("/api/create-{slug}"), post(handlers::create_taxon))
        .route(&format!("/api/update-{slug}/{{id}}"), put(handlers::update_taxon))
        .route(&format!("/api/get-admin-{plural}"), get(handlers::list_taxa))
        .route(&format!("/api/get-admin-{slug}/{{id}}"), get(handlers::get_taxon));

    // Departments are removed physically; every other level is soft-deleted.
    let router = match level.parent() {
        None => router.route(
            &format!("/api/delete-{slug}/{{id}}"),
            delete(handlers::delete_department),
        ),
        Some(_) => router.route(
            &format!("/api/delete-{slug}/{{id}}"),
            put(handlers::delete_taxon),
        ),
    };

    router.layer(Extension(level))
}
