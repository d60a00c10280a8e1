pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod engine;
pub mod error;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::api::rate_limit::RateLimiter;
use crate::engine::{BookingManager, SessionStore};

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub sessions: SessionStore,
    pub bookings: BookingManager,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let sessions = SessionStore::new(db.clone(), config.auth.session_ttl());
        let bookings = BookingManager::new(db.clone());
        Self {
            config,
            db,
            sessions,
            bookings,
            rate_limiter,
        }
    }
}
