use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tollbooth::catalog::ProductCatalog;
use tollbooth::config::Config;
use tollbooth::db::{create_pool, init_db, queries, AppState};
use tollbooth::gateway::GatewayClient;
use tollbooth::handlers;

#[derive(Parser, Debug)]
#[command(name = "tollbooth")]
#[command(about = "Checkout and payment reconciliation service")]
struct Cli {
    /// Create a dev session token for manual testing (dev mode only)
    #[arg(long)]
    seed: bool,
}

/// Create a session for a dev user and print the bearer token.
fn seed_dev_session(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let token = uuid::Uuid::new_v4().as_simple().to_string();
    let user_id = "dev-user";
    let one_week = 7 * 24 * 3600;

    queries::create_session(&conn, user_id, &token, one_week)
        .expect("Failed to create dev session");

    tracing::info!("============================================");
    tracing::info!("DEV SESSION CREATED");
    tracing::info!("User: {}", user_id);
    tracing::info!("Token: {}", token);
    tracing::info!("============================================");

    // Copy-paste friendly output (no log formatting)
    println!();
    println!("Authorization: Bearer {}", token);
    println!();
}

/// Spawns a background task that periodically drops expired sessions.
fn spawn_session_cleanup(state: AppState) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(15 * 60);

        loop {
            tokio::time::sleep(interval).await;

            match state.db.get() {
                Ok(conn) => match queries::purge_expired_sessions(&conn) {
                    Ok(count) if count > 0 => {
                        tracing::debug!("Purged {} expired sessions", count);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("Failed to purge sessions: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to get db connection for cleanup: {}", e);
                }
            }
        }
    });

    tracing::info!("Session cleanup task started (runs every 15 minutes)");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tollbooth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let catalog = match &config.products_path {
        Some(path) => {
            let catalog = ProductCatalog::from_json_file(path).expect("Failed to load catalog");
            tracing::info!("Loaded {} products from {}", catalog.len(), path.display());
            catalog
        }
        None => ProductCatalog::builtin(),
    };

    let state = AppState {
        db: db_pool,
        catalog: Arc::new(catalog),
        gateway: GatewayClient::new(config.gateway.clone()),
        base_url: config.base_url.clone(),
        success_page_url: config.success_page_url.clone(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set TOLLBOOTH_ENV=dev)");
        } else {
            seed_dev_session(&state);
        }
    }

    spawn_session_cleanup(state.clone());

    let app = Router::new()
        // Storefront-facing endpoints (session auth)
        .merge(handlers::public::router())
        // Gateway-facing webhook (signature auth)
        .merge(handlers::webhooks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Tollbooth server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
