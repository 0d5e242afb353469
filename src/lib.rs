pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod extractors;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use ledger::PgLedger;
use services::{EventReservationEngine, ReservationEngine};

// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub cache: Option<cache::CacheService>,
    pub config: config::Config,
    pub ledger: PgLedger,
    pub reservations: ReservationEngine<PgLedger>,
    pub event_reservations: EventReservationEngine<PgLedger>,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database).await?;
        info!("Database connected");

        db.run_migrations().await?;

        let cache = match config.redis.url.as_deref() {
            Some(url) => match redis_client::RedisClient::new(url).await {
                Ok(redis) => {
                    info!("Redis connected");
                    Some(cache::CacheService::new(redis, config.redis.occupied_seats_ttl_secs))
                }
                Err(e) => {
                    warn!("Redis unavailable, running without cache: {:?}", e);
                    None
                }
            },
            None => {
                info!("REDIS_URL not set, occupied seats cache disabled");
                None
            }
        };

        Ok(Self::with_database(db, config, cache))
    }

    pub fn with_database(
        db: database::Database,
        config: config::Config,
        cache: Option<cache::CacheService>,
    ) -> Arc<Self> {
        let ledger = PgLedger::new(db.pool.clone());
        let reservations = ReservationEngine::new(ledger.clone(), &config.booking);
        let event_reservations = EventReservationEngine::new(ledger.clone());

        Arc::new(Self {
            db,
            cache,
            config,
            ledger,
            reservations,
            event_reservations,
        })
    }
}

// Liveness plus a round trip to Postgres
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.db.pool).await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            warn!("Health check failed: {:?}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cinema booking API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
