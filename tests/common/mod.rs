//! Shared fixtures for the Postgres-backed integration tests.
//!
//! Catalog rows (users, movies, cinemas, events) are owned by other services,
//! so tests seed them with plain SQL.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use sqlx::PgPool;

use cinema_booking::config::{
    AppConfig, BookingConfig, Config, DatabaseConfig, JwtConfig, LogFormat, RedisConfig,
};
use cinema_booking::database::Database;
use cinema_booking::middleware::{Claims, ClaimsUser};
use cinema_booking::{app, AppState};

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn test_config() -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            rust_log: "cinema_booking=debug".to_string(),
            log_format: LogFormat::Pretty,
        },
        database: DatabaseConfig {
            url: String::new(),
            pool_size: 10,
            acquire_timeout_secs: 5,
        },
        redis: RedisConfig {
            url: None,
            occupied_seats_ttl_secs: 30,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        booking: BookingConfig::default(),
    }
}

/// Full router over the given pool, without the Redis cache.
pub fn build_test_app(pool: PgPool) -> Router {
    let state: Arc<AppState> = AppState::with_database(Database::from_pool(pool), test_config(), None);
    app(state)
}

pub async fn seed_user(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (username, email) VALUES ($1, $2) RETURNING user_id",
    )
    .bind(name)
    .bind(format!("{name}@example.com"))
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_showtime(pool: &PgPool, capacity: i32, ticket_price: i64) -> i64 {
    let movie_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO movies (title, genre) VALUES ('Mai', 'Drama') RETURNING movie_id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let cinema_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO cinemas (name, city) VALUES ('CGV Vincom', 'Hà Nội') RETURNING cinema_id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO showtimes (movie_id, cinema_id, start_time, ticket_price, capacity, available_seats)
        VALUES ($1, $2, NOW() + interval '1 day', $3, $4, $4)
        RETURNING showtime_id
        "#,
    )
    .bind(movie_id)
    .bind(cinema_id)
    .bind(ticket_price)
    .bind(capacity)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_event(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO events (title, event_date) VALUES ('Hoà nhạc', NOW() + interval '7 days') RETURNING event_id",
    )
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn available_seats(pool: &PgPool, showtime_id: i64) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT available_seats FROM showtimes WHERE showtime_id = $1")
        .bind(showtime_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn bearer(user_id: i64) -> String {
    let token = Claims::issue(
        ClaimsUser {
            id: user_id,
            name: format!("user{user_id}"),
            email: format!("user{user_id}@example.com"),
        },
        JWT_SECRET,
        Duration::hours(1),
    )
    .unwrap();
    format!("Bearer {token}")
}

pub fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
