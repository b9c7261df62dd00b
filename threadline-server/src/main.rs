//! Threadline Server
//!
//! Post and comment services joined by a fanout event channel. Deleting a
//! post purges its comments through `PostDeleted` events; deleting a comment
//! removes its whole reply thread.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::runtime::{ChannelConfig, ServiceRole};
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use threadline_core::events::{EventChannel, EventPublisher};
use threadline_core::framework::DatabaseProcessor;
use threadline_core::processors::CommentLifecycleSubscriber;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Threadline - post and comment services with cascading deletion
#[derive(Parser, Debug)]
#[command(name = "threadline-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./threadline.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Override the service role (posts, comments or all)
    #[arg(short, long)]
    role: Option<ServiceRole>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting threadline-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen, args.role));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    let role = loaded_config.server.role;
    tracing::info!(%role, "Configuration loaded from {:?}", args.config);

    let (shared_config, channel_config) = loaded_config.into_shared();

    // Get database URL from environment
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Event channel, shared by the publishers and the subscriber
    let channel = channel_config.backend.open().map_err(|e| {
        tracing::error!("Failed to open event channel: {}", e);
        e
    })?;
    tracing::info!(backend = ?channel_config.backend, "Event channel ready");

    // Start the post event subscriber when this process owns comments
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let subscriber_handle = role.serves_comments().then(|| {
        spawn_comment_subscriber(&db_pool, channel.clone(), &channel_config, shutdown_rx)
    });

    // Create application state
    let state = AppState::new(
        db_pool.clone(),
        shared_config,
        EventPublisher::new(channel).with_timeout(channel_config.publish_timeout),
    );

    // Spawn config reload handler (listens for SIGHUP)
    let shutdown_notify = spawn_config_reload_handler(state.clone(), config_loader);

    // Build the router
    let router = build_router(state, role);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop background tasks
    shutdown_notify.notify_one();
    let _ = shutdown_tx.send(true);
    if let Some(handle) = subscriber_handle {
        if let Err(e) = handle.await {
            tracing::error!("Comment subscriber task failed: {}", e);
        }
    }

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

fn spawn_comment_subscriber(
    db_pool: &sqlx::PgPool,
    channel: Arc<dyn EventChannel>,
    channel_config: &ChannelConfig,
    shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let subscriber = CommentLifecycleSubscriber::new(
        DatabaseProcessor::new(db_pool.clone()),
        channel,
        channel_config.subscriber_backoff,
        shutdown_rx,
    );
    tokio::spawn(subscriber.run())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
