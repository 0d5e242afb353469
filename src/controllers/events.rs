use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::AppResult;
use crate::extractors::ValidJson;
use crate::middleware::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/bookings", post(create_event_booking))
}

// POST /api/events/bookings
#[derive(Debug, Deserialize, Validate)]
struct CreateEventBookingRequest {
    #[validate(range(min = 1, message = "event_id must be > 0"))]
    event_id: i64,
    #[validate(range(min = 1, message = "number_of_tickets must be > 0"))]
    number_of_tickets: i32,
    #[validate(range(min = 1, message = "total_amount must be > 0"))]
    total_amount: i64,
}

async fn create_event_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(req): ValidJson<CreateEventBookingRequest>,
) -> AppResult<impl IntoResponse> {

    let receipt = state
        .event_reservations
        .reserve_event(user.user_id, req.event_id, req.number_of_tickets, req.total_amount)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Event booking created",
            "bookingId": receipt.booking_id,
            "numberOfTickets": receipt.number_of_tickets,
            "totalAmount": receipt.total_amount,
        })),
    ))
}
