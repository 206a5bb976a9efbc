use actix_web::{middleware::Compress, web, App, HttpServer, Responder};
use actix_cors::Cors;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use startives::openapi::ApiDoc;
use startives::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use startives::routes::{config, AppState};
use startives::security::SecurityHeaders;
use startives::storage::build_file_store;

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
use startives::repo::inmem::InMemRepo;

static PROMETHEUS: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("install prometheus recorder")
});

async fn metrics_endpoint() -> impl Responder {
    PROMETHEUS.render()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Environment variables must be set externally (shell, systemd, Docker, etc.)
    // Load .env automatically only in debug builds to reduce manual setup overhead.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    validate_env_vars();

    // Structured logging initialisation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping Startives API");

    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    let repo = InMemRepo::new();
    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    info!("Using in-memory repository backend");

    #[cfg(feature = "postgres-store")]
    let repo = {
        use sqlx::postgres::PgPoolOptions;
        let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres-store");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .expect("Failed to connect to Postgres");
        sqlx::migrate!()
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        info!("Using Postgres repository backend");
        startives::repo::pg::PgRepo::new(pool)
    };

    let openapi = ApiDoc::openapi();
    let file_store = build_file_store();
    Lazy::force(&PROMETHEUS);

    let rate_limiter = {
        let enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        enabled.then(|| RateLimiterFacade::new(InMemoryRateLimiter::new(true), RateLimitConfig::from_env()))
    };

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // local React dev servers
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                .supports_credentials()
                .max_age(3600);
            if let Ok(front) = std::env::var("FRONTEND_URL") {
                c = c.allowed_origin(&front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::from_env())
            .wrap(cors)
            .configure(config)
            .service(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi.clone()))
            .route("/metrics", web::get().to(metrics_endpoint))
            .app_data(web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                file_store: file_store.clone(),
                rate_limiter: rate_limiter.clone(),
            }))
    })
    .bind(("0.0.0.0", 8080))?;

    info!("Listening on http://0.0.0.0:8080");

    server.run().await
}

/// Validate that required environment variables are set
fn validate_env_vars() {
    use std::env;

    if env::var("JWT_SECRET").is_err() {
        eprintln!("Missing required environment variable JWT_SECRET");
        eprintln!("Please copy .env.example to .env and configure it");
        std::process::exit(1);
    }

    if let Ok(secret) = env::var("JWT_SECRET") {
        if secret.len() < 32 {
            eprintln!("JWT_SECRET must be at least 32 characters long for security");
            std::process::exit(1);
        }
    }
}
