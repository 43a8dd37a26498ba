use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tracing::info;

mod app;
mod app_state;
mod clock;
mod config;
mod db;
mod error;
mod middleware;
mod modules;
mod notifications;
mod telemetry;

use clock::SystemClock;
use modules::bookings::BookingEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    telemetry::init_telemetry(None).await?;

    let config = config::init()?;

    let pool = db::init_pool()
        .await
        .context("Failed to initialize database pool")?;

    let notifier = notifications::from_config(&config.smtp)?;
    let engine = Arc::new(BookingEngine::new(
        pool.clone(),
        Arc::new(SystemClock),
        notifier,
    ));

    let state = app_state::AppState::new(pool, config.clone(), engine);
    let app = app::create_router(state);

    let addr = config.server_addr();
    info!("{} listening on {}", config.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Failed to serve application")?;

    Ok(())
}
