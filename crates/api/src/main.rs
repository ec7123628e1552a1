use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edupub_api::config::{LogFormat, ServerConfig};
use edupub_api::routes;
use edupub_api::state::AppState;
use edupub_core::generation::ContentGenerator;
use edupub_core::store::{ContentStore, InMemoryContentStore};
use edupub_publisher::dispatch::DispatchQueue;
use edupub_publisher::document::{DocumentPublisher, HttpDocumentPublisher, DEFAULT_REQUEST_TIMEOUT};
use edupub_publisher::generation::HttpContentGenerator;
use edupub_publisher::rate_limiter::RateLimiter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let json_logs = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edupub_api=debug,edupub_publisher=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Persistence ---
    let (pool, store): (_, Arc<dyn ContentStore>) = match &config.database_url {
        Some(database_url) => {
            let pool = edupub_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            edupub_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            edupub_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let store: Arc<dyn ContentStore> =
                Arc::new(edupub_db::PgContentStore::new(pool.clone()));
            (Some(pool), store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; content is kept in memory only");
            let store: Arc<dyn ContentStore> = Arc::new(InMemoryContentStore::new());
            (None, store)
        }
    };

    // --- Outbound publishing: rate limiter + dispatch queue ---
    let rate_limiter = Arc::new(
        RateLimiter::new(config.publish_rate).expect("Invalid publishing rate limit"),
    );
    let dispatch_cancel = CancellationToken::new();
    let (queue, dispatch_handle) =
        DispatchQueue::start(Arc::clone(&rate_limiter), dispatch_cancel.clone());

    let publisher: Arc<dyn DocumentPublisher> = Arc::new(
        HttpDocumentPublisher::new(
            config.publishing_api_url.clone(),
            config.publishing_api_token.clone(),
            DEFAULT_REQUEST_TIMEOUT,
        )
        .expect("Failed to build publishing client"),
    );
    let generator: Arc<dyn ContentGenerator> = Arc::new(
        HttpContentGenerator::new(config.generation_api_url.clone(), config.generation_timeout())
            .expect("Failed to build generation client"),
    );
    tracing::info!(
        publishing_api_url = %config.publishing_api_url,
        generation_api_url = %config.generation_api_url,
        "External service clients ready"
    );

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- App state ---
    let state = AppState::new(
        config.clone(),
        pool,
        store,
        generator,
        publisher,
        rate_limiter,
        queue,
    );

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        // Health check at root level (not under /api/v1).
        .merge(routes::health::router())
        // API v1 routes.
        .nest("/api/v1", routes::api_routes())
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500.
        .layer(CatchPanicLayer::new())
        // Request timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Propagate request ID to response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Set request ID on incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        // CORS.
        .layer(cors)
        // Shared state.
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    dispatch_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), dispatch_handle).await;
    tracing::info!("Dispatch worker stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
