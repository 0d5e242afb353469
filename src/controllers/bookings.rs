use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::AppResult;
use crate::extractors::ValidJson;
use crate::middleware::AuthUser;
use crate::services::BookingReceipt;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/users/me/bookings", get(get_user_bookings))
}

/* ---------- BOOKINGS ---------- */

// POST /api/bookings
#[derive(Debug, Deserialize, Validate)]
struct CreateBookingRequest {
    #[validate(range(min = 1, message = "showtime_id must be > 0"))]
    showtime_id: i64,
    #[validate(length(min = 1, message = "at least one seat must be selected"))]
    seats: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CreateBookingResponse {
    message: &'static str,
    #[serde(flatten)]
    receipt: BookingReceipt,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(req): ValidJson<CreateBookingRequest>,
) -> AppResult<impl IntoResponse> {

    let receipt = state
        .reservations
        .reserve(user.user_id, req.showtime_id, req.seats)
        .await?;

    // Only after commit: the cache is never touched inside the reservation session
    if let Some(cache) = &state.cache {
        cache.invalidate_occupied_seats(receipt.showtime_id).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            message: "Booking created",
            receipt,
        }),
    ))
}

// GET /api/users/me/bookings
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let history = state.ledger.booking_history(user.user_id).await?;
    Ok((StatusCode::OK, Json(history)))
}
