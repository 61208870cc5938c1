//! Loan funding engine server
//!
//! Wires the ledger, file store, mail transport and notification worker
//! together at startup and serves the loan workflow API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use loanflow_server::app_state::AppState;
use loanflow_server::auth::JwtSecret;
use loanflow_server::config::Config;
use loanflow_server::db;
use loanflow_server::files::{FileStore, LocalFileStore};
use loanflow_server::ledger::{LedgerStore, PgLedger};
use loanflow_server::notify::{
    AgreementNotifier, AgreementPublisher, GatewayMailer, LogMailer, MailTransport,
};
use loanflow_server::report::HtmlRenderer;
use loanflow_server::routes;
use loanflow_server::service::LoanService;

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "starting loan funding engine");

    // Initialize database connection pool and schema
    let db_pool = match db::create_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = db::run_migrations(&db_pool).await {
        tracing::error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    // Document storage
    let local_files = LocalFileStore::new(db_pool.clone(), config.storage_dir.clone());
    if let Err(e) = local_files.ensure_base_dir().await {
        tracing::error!("Failed to prepare storage directory: {}", e);
        std::process::exit(1);
    }
    let files: Arc<dyn FileStore> = Arc::new(local_files);

    // Ledger store
    let ledger: Arc<dyn LedgerStore> = Arc::new(PgLedger::new(db_pool.clone()));

    // Mail transport: HTTP gateway when configured, log-only otherwise
    let mailer: Arc<dyn MailTransport> = match &config.mail_gateway_url {
        Some(url) => Arc::new(GatewayMailer::new(url.clone(), config.mail_from.clone())),
        None => Arc::new(LogMailer::new()),
    };

    // Agreement pipeline worker
    let publisher = AgreementPublisher::new(
        Arc::clone(&ledger),
        Arc::clone(&files),
        Arc::new(HtmlRenderer::new()),
        mailer,
        config.public_base_url.clone(),
    );
    let (notifier, _notify_worker) =
        AgreementNotifier::spawn(publisher, config.notify_queue_depth);

    // Workflow orchestrator
    let loan_service = Arc::new(LoanService::new(
        Arc::clone(&ledger),
        Arc::clone(&files),
        notifier,
    ));

    let app_state = AppState::new(
        loan_service,
        files,
        JwtSecret(config.jwt_secret.clone()),
    );

    // Clone db_pool for health check
    let health_db_pool = db_pool.clone();

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(move || health_check(health_db_pool.clone())))
        .merge(routes::loan_routes())
        .merge(routes::file_routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(configure_cors(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server shutdown complete");
}

async fn root() -> &'static str {
    "Loan Funding Engine API"
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(pool: sqlx::PgPool) -> axum::Json<HealthResponse> {
    let db_status = match db::check_health(&pool).await {
        Ok(_) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if db_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    axum::Json(HealthResponse {
        status: status.to_string(),
        database: db_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
