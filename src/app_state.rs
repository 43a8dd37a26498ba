use std::sync::Arc;

use sqlx::PgPool;

use crate::config;
use crate::modules::bookings::BookingEngine;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub env: config::Config,
    pub engine: Arc<BookingEngine>,
}

impl AppState {
    pub fn new(db: PgPool, env: config::Config, engine: Arc<BookingEngine>) -> Self {
        Self { db, env, engine }
    }
}
