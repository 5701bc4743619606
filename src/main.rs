//! Feedwire Server: real-time feed update distribution.
//!
//! Main entry point that wires all crates together and starts the server.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use feedwire_api::AppState;
use feedwire_auth::{JwtDecoder, MemoryTokenStore, TokenStore};
use feedwire_core::config::AppConfig;
use feedwire_core::error::AppError;
use feedwire_database::{FeedRepository, MemoryStore, SubscriptionRepository};
use feedwire_entity::{Feed, FeedMonitors};
use feedwire_hubbub::Hubbub;
use feedwire_realtime::EventHub;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("FEEDWIRE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Feedwire v{}", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(config);
    let shutdown = CancellationToken::new();

    // ── Step 1: Persistence ──────────────────────────────────────
    let store = Arc::new(MemoryStore::new());
    let feeds: Arc<dyn FeedRepository> = store.clone();
    let subscriptions: Arc<dyn SubscriptionRepository> = store;

    // ── Step 2: Auth ─────────────────────────────────────────────
    let token_store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new(&config.auth));
    let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth, token_store));

    // ── Step 3: Event broadcast hub ──────────────────────────────
    let events = EventHub::start(&config.realtime, shutdown.clone());

    // ── Step 4: Push hub subscriptions ───────────────────────────
    let (resume_tx, resume_rx) = mpsc::channel::<Feed>(config.hubbub.resume_buffer.max(1));
    let hubbub = if config.hubbub.is_configured() {
        tracing::info!("Initializing hub subscriptions...");
        let hubbub = Hubbub::start(
            &config,
            Arc::clone(&feeds),
            Arc::clone(&subscriptions),
            resume_tx,
            shutdown.clone(),
        )?;
        hubbub.init_subscriptions().await?;
        Some(hubbub)
    } else {
        tracing::info!("Hub callback URL not set, push subscriptions disabled");
        drop(resume_tx);
        None
    };
    let resume_handle = tokio::spawn(drain_resume_polling(resume_rx, shutdown.clone()));

    // ── Step 5: Feed monitors ────────────────────────────────────
    let mut monitors = FeedMonitors::new();
    if let Some(hubbub) = &hubbub {
        monitors.add(Arc::new(hubbub.clone()));
    }
    monitors.add(Arc::new(events.clone()));
    tracing::info!(monitors = monitors.len(), "Feed monitors registered");

    // ── Step 6: Build and start HTTP server ──────────────────────
    let app_state = AppState {
        config: Arc::clone(&config),
        jwt_decoder,
        feeds,
        subscriptions,
        events,
        hubbub,
        monitors,
    };
    let app = feedwire_api::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Feedwire server listening on {}", addr);

    // ── Step 7: Graceful shutdown ────────────────────────────────
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.clone().cancelled_owned())
    .into_future();

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let signal = async {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        shutdown.cancel();
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| AppError::internal(format!("Server error: {}", e)))?;
        }
        _ = signal => {
            tracing::warn!("Graceful shutdown did not finish within {:?}", grace);
        }
    }

    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), resume_handle).await;

    tracing::info!("Feedwire server shut down gracefully");
    Ok(())
}

/// Log feeds handed back by the subscription manager until shutdown.
async fn drain_resume_polling(mut rx: mpsc::Receiver<Feed>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            feed = rx.recv() => match feed {
                Some(feed) => tracing::warn!(
                    feed_id = %feed.id,
                    error = feed.subscribe_error.as_deref().unwrap_or("unknown"),
                    "Hub subscription failed, feed returns to polling"
                ),
                None => break,
            },
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
