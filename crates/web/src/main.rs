use std::sync::Arc;

use anyhow::Context;
use provider::{ChessComClient, RateLimiter};
use storage::Database;
use storage::repository::{JobQueue, PgAnalysisRepository, PgJobQueue, PgRatingCache};
use tokio_util::sync::CancellationToken;
use web::middleware::auth::ApiKeys;
use web::{AppState, Config, routes};
use worker::{Dispatcher, Orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting chess rating evolution API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    let pool = db.pool().clone();
    let analyses = Arc::new(PgAnalysisRepository::new(pool.clone()));
    let queue = Arc::new(PgJobQueue::new(pool.clone()));

    let requeued = queue
        .requeue_unfinished()
        .await
        .context("Failed to requeue unfinished analyses")?;
    if requeued > 0 {
        tracing::info!(requeued, "Requeued unfinished analyses");
    }

    let limiter = Arc::new(RateLimiter::new(config.provider_min_interval));
    let chess_com = Arc::new(
        ChessComClient::new(config.chess_api_base_url.clone(), limiter)
            .context("Failed to build rating provider client")?,
    );
    let orchestrator = Arc::new(Orchestrator::new(
        analyses.clone(),
        Arc::new(PgRatingCache::new(pool.clone())),
        chess_com.clone(),
        chess_com,
        config.orchestrator_config(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        queue,
        analyses,
        orchestrator,
        config.dispatcher_config(),
    ));

    let cancel = CancellationToken::new();
    let dispatcher_task = tokio::spawn(dispatcher.run(cancel.clone()));

    let state = AppState::postgres(
        pool,
        config.payment_policy,
        ApiKeys::from_comma_separated(&config.api_keys),
    );
    let app = routes::router(state);

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    cancel.cancel();
    dispatcher_task
        .await
        .context("Dispatcher task failed")?;

    Ok(())
}
