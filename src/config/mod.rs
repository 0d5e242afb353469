use serde::Deserialize;
use std::env;

// Top-level configuration, assembled from the environment at startup
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
}

// Redis is optional: without REDIS_URL the occupied-seats cache is disabled
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub occupied_seats_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub max_seats_per_booking: usize,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self { max_seats_per_booking: 10 }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: var_or("PORT", "5001")
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "cinema_booking=debug,tower_http=debug"),
                log_format: LogFormat::parse(&var_or("LOG_FORMAT", "pretty")),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: var_or("DB_POOL_SIZE", "20")
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
                acquire_timeout_secs: var_or("DB_ACQUIRE_TIMEOUT_SECS", "5")
                    .parse()
                    .expect("DB_ACQUIRE_TIMEOUT_SECS must be a valid number"),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
                occupied_seats_ttl_secs: var_or("OCCUPIED_SEATS_CACHE_TTL_SECS", "30")
                    .parse()
                    .expect("OCCUPIED_SEATS_CACHE_TTL_SECS must be a valid number"),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            },
            booking: BookingConfig {
                max_seats_per_booking: var_or("MAX_SEATS_PER_BOOKING", "10")
                    .parse()
                    .expect("MAX_SEATS_PER_BOOKING must be a valid number"),
            },
        }
    }
}
