use crate::cache::CacheService;
use redis::AsyncCommands;
use tracing::{debug, warn};

fn occupied_key(showtime_id: i64) -> String {
    format!("showtime:{}:occupied", showtime_id)
}

fn decode_seats(data: &str) -> Result<Vec<String>, redis::RedisError> {
    serde_json::from_str(data).map_err(|_| {
        redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
    })
}

fn encode_seats(seats: &[String]) -> Result<String, redis::RedisError> {
    serde_json::to_string(seats).map_err(|_| {
        redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
    })
}

impl CacheService {
    /// `Ok(None)` on a cache miss.
    pub async fn get_occupied_seats(&self, showtime_id: i64) -> Result<Option<Vec<String>>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(occupied_key(showtime_id)).await?;
        data.as_deref().map(decode_seats).transpose()
    }

    pub async fn cache_occupied_seats(&self, showtime_id: i64, seats: &[String]) -> Result<(), redis::RedisError> {
        let data = encode_seats(seats)?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(occupied_key(showtime_id), data, self.occupied_seats_ttl_secs).await
    }

    // Called after a reservation commits; a failure only means a stale read until the TTL expires
    pub async fn invalidate_occupied_seats(&self, showtime_id: i64) {
        let mut conn = self.redis.conn.clone();
        match conn.del::<_, ()>(occupied_key(showtime_id)).await {
            Ok(()) => debug!("Invalidated occupied seats cache for showtime {}", showtime_id),
            Err(e) => warn!("Failed to invalidate occupied seats for showtime {}: {:?}", showtime_id, e),
        }
    }
}
