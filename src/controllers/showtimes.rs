use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::ledger::LedgerStore;
use crate::models::ShowtimeAvailability;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showtimes/{showtime_id}", get(get_showtime))
        .route("/showtimes/{showtime_id}/occupied-seats", get(get_occupied_seats))
}

fn check_id(showtime_id: i64) -> AppResult<()> {
    if showtime_id <= 0 {
        return Err(AppError::BadRequest("showtime_id must be > 0".to_string()));
    }
    Ok(())
}

// GET /api/showtimes/{showtime_id}
async fn get_showtime(
    State(state): State<Arc<AppState>>,
    Path(showtime_id): Path<i64>,
) -> AppResult<Json<ShowtimeAvailability>> {
    check_id(showtime_id)?;

    let showtime = state
        .ledger
        .showtime(showtime_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Showtime {showtime_id} not found")))?;
    let booked = state.ledger.booked_seat_count(showtime_id).await?;

    let availability = ShowtimeAvailability::new(showtime, booked);
    if !availability.is_consistent() {
        tracing::warn!(
            showtime_id,
            available_seats = availability.showtime.available_seats,
            derived = availability.derived_available_seats,
            "available_seats drifted from booked_seats"
        );
    }
    Ok(Json(availability))
}

// GET /api/showtimes/{showtime_id}/occupied-seats
async fn get_occupied_seats(
    State(state): State<Arc<AppState>>,
    Path(showtime_id): Path<i64>,
) -> AppResult<Json<Vec<String>>> {
    check_id(showtime_id)?;

    if let Some(cache) = &state.cache {
        match cache.get_occupied_seats(showtime_id).await {
            Ok(Some(seats)) => return Ok(Json(seats)),
            Ok(None) => {}
            Err(e) => tracing::warn!("occupied seats cache read failed: {:?}", e),
        }
    }

    let seats = state.ledger.occupied_seats(showtime_id).await?;

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.cache_occupied_seats(showtime_id, &seats).await {
            tracing::warn!("failed to cache occupied seats: {:?}", e);
        }
    }

    Ok(Json(seats))
}
