use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use taxonomy_backend::{
    AppState,
    auth::TokenService,
    config::{AppConfig, Env},
    create_router,
    models::AccountRequest,
    repository::{PostgresRepository, RepositoryState},
    service::TaxonomyService,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, connects and migrates the database, seeds the
/// superadmin if configured, then serves HTTP.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise a verbose local default.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taxonomy_backend=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let postgres = PostgresRepository::new(pool);
    postgres
        .migrate()
        .await
        .expect("FATAL: Failed to apply database migrations.");
    let repo = Arc::new(postgres) as RepositoryState;

    // 4. Service
    let tokens = TokenService::new(
        &config.jwt_secret,
        chrono::Duration::minutes(config.token_ttl_minutes),
    );
    let service = Arc::new(TaxonomyService::new(repo, tokens));

    // 5. Superadmin seed
    if let Some(seed) = &config.superadmin {
        let request = AccountRequest {
            username: seed.username.clone(),
            password: seed.password.clone(),
        };
        match service.bootstrap_superadmin(request).await {
            Ok(Some(account)) => {
                tracing::info!(account_id = account.id, "superadmin seeded from environment")
            }
            Ok(None) => tracing::debug!("superadmin already present; seed skipped"),
            Err(e) => tracing::error!(error = %e, "superadmin seed failed"),
        }
    }

    // 6. Router and server
    let app = create_router(AppState { service });

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", config.bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
