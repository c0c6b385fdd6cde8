use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Span;

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

// Routers grouped by the privilege they demand (public, superadmin, admin).
pub mod routes;
use routes::{accounts, public, taxonomy};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{RepositoryError, ServiceError};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use service::{ServiceState, TaxonomyService};

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`. Per-level and per-kind routes
/// share handlers, so their paths are documented once with the varying segment templated.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout,
        handlers::create_account, handlers::create_superadmin, handlers::update_account,
        handlers::list_accounts, handlers::get_account, handlers::delete_account,
        handlers::activate_account,
        handlers::create_taxon, handlers::update_taxon, handlers::list_taxa,
        handlers::get_taxon, handlers::delete_taxon, handlers::delete_department
    ),
    components(
        schemas(
            models::Account, models::AccountKind, models::AccountRequest, models::LoginRequest,
            models::LoginResponse, models::DeleteFlag, models::ActiveFlag, models::Updated,
            models::Message, models::Level, models::Taxon, models::TaxonRequest,
            models::ParentKeys,
        )
    ),
    tags(
        (name = "taxonomy", description = "Taxonomy hierarchy admin API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared state. The service owns the store and the token service; handlers
/// need nothing else, so configuration stays in `main`.
#[derive(Clone)]
pub struct AppState {
    pub service: ServiceState,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ServiceState {
    fn from_ref(app_state: &AppState) -> ServiceState {
        app_state.service.clone()
    }
}

/// create_router
///
/// Assembles every route group, the Swagger UI, and the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(accounts::account_routes())
        .merge(taxonomy::taxonomy_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(tracing::Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echo the id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` so every log line of one
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
