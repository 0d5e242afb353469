use crate::redis_client::RedisClient;

pub mod seats;

/// Read-through cache in front of the ledger's lock-free reads.
///
/// Never used inside a reservation session: entries are only invalidated
/// after the session has committed.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    occupied_seats_ttl_secs: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, occupied_seats_ttl_secs: u64) -> Self {
        Self { redis, occupied_seats_ttl_secs }
    }
}
