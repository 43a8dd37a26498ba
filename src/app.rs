use axum::{middleware, routing::get, Json, Router};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::{
    app_state::AppState,
    middleware::tracing::observability_middleware,
    modules::availability::availability_routes,
    modules::bookings::booking_routes,
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .nest("/bookings", booking_routes())
        .nest("/instructors", availability_routes())
        .layer(middleware::from_fn(observability_middleware))
        .with_state(state)
}

async fn hello() -> &'static str {
    "EduMarket Backend says hello!\n"
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let db_result = sqlx::query("SELECT 1").execute(&state.db).await;

    let db_status = match db_result {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::info!("Database health check failed: {}", e);
            "unhealthy"
        }
    };

    // Get telemetry health status
    let telemetry_health = crate::telemetry::telemetry_health_check();

    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(json!({
        "status": "ok",
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "telemetry": telemetry_health
        }
    }))
}
