use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roombook::api::rate_limit;
use roombook::config::Config;
use roombook::engine::spawn_session_sweeper;
use roombook::AppState;

#[derive(Parser, Debug)]
#[command(name = "roombook")]
#[command(author, version, about = "Room booking service", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "ROOMBOOK_CONFIG", default_value = "roombook.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting roombook v{}", env!("CARGO_PKG_VERSION"));

    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.server.data_dir.display()
        )
    })?;

    let db = roombook::db::init(&config.server.data_dir).await?;

    roombook::db::ensure_admin_user(&db, &config.auth).await?;
    roombook::db::seed_rooms(&db, &config.seed.rooms).await?;

    if roombook::db::User::count(&db).await? == 0 {
        tracing::warn!(
            "No user accounts exist; set auth.admin_email and auth.admin_password to create an admin"
        );
    }

    let state = Arc::new(AppState::new(config.clone(), db));

    spawn_session_sweeper(
        state.sessions.clone(),
        config.auth.session_sweep_interval_secs,
    );
    rate_limit::spawn_cleanup_task(
        state.rate_limiter.clone(),
        config.rate_limit.cleanup_interval,
    );

    let app = roombook::api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
