// src/main.rs

use drivers_ed::config::Config;
use drivers_ed::routes;
use drivers_ed::services::{exam::QuestionBank, payment::MockPaymentProcessor};
use drivers_ed::state::AppState;
use drivers_ed::storage::SqliteStore;
use drivers_ed::utils::clock::SystemClock;
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "drivers-ed.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to open database after 5 retries: {}", e);
                    return Err(e.into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .inspect_err(|e| tracing::error!("Failed to run migrations: {}", e))?;
    tracing::info!("Migrations applied successfully.");

    let bank = match &config.question_bank_path {
        Some(path) => {
            let bank = QuestionBank::from_json_file(path).inspect_err(|e| {
                tracing::error!("Failed to load question bank {}: {}", path.display(), e)
            })?;
            tracing::info!("Loaded {} questions from {}", bank.len(), path.display());
            bank
        }
        None => QuestionBank::builtin(),
    };

    let state = AppState::initialize(
        &config,
        Arc::new(SqliteStore::new(pool)),
        Arc::new(SystemClock),
        Arc::new(MockPaymentProcessor::new(Duration::from_millis(
            config.payment_delay_ms,
        ))),
        bank,
    )
    .await;

    // Background re-validation of time-limited grants
    let _sweep = state
        .entitlements
        .clone()
        .spawn_expiry_sweep(Duration::from_secs(config.expiry_poll_secs));

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .inspect_err(|e| tracing::error!("Failed to bind {}: {}", config.bind_addr, e))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    // Start the server
    axum::serve(listener, app)
        .await
        .inspect_err(|e| tracing::error!("Server error: {}", e))?;

    Ok(())
}
