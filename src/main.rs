// src/main.rs

use std::{net::SocketAddr, sync::Arc, time::Duration};

use adaptive_tutor::{
    clients::{generator::LlmContentGenerator, sandbox::Judge0Runner},
    config::Config,
    routes, seed,
    state::AppState,
    store,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env is read inside)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
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
        match store::connect(&config.database_url).await {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to open database after 5 retries: {}", e);
                    std::process::exit(1);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    if let Err(e) = store::migrate(&pool).await {
        tracing::error!("Failed to run database migrations: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Migrations applied successfully.");

    if config.seed_subjects {
        match seed::seed_subjects(&pool).await {
            Ok(created) => tracing::info!("Subject catalog seeded ({} new)", created),
            Err(e) => tracing::error!("Failed to seed subjects: {}", e),
        }
    }

    let generator = match LlmContentGenerator::from_config(&config) {
        Ok(generator) => generator,
        Err(e) => {
            tracing::error!("Failed to build content generator client: {}", e);
            std::process::exit(1);
        }
    };
    let runner = match Judge0Runner::from_config(&config) {
        Ok(runner) => runner,
        Err(e) => {
            tracing::error!("Failed to build sandbox client: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(pool, config.clone(), Arc::new(generator), Arc::new(runner));

    // Create the Axum application router
    let app = routes::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
