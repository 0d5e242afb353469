use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::ledger::StoreError;
use crate::services::{EventReservationError, ReservationError};

/// HTTP-facing error. Every variant renders as `{"error", "code"}` JSON;
/// seat conflicts also carry the occupied `seats`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error(transparent)]
    EventReservation(#[from] EventReservationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type AppResult<T> = Result<T, AppError>;

fn internal(err: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Reservation(err) => match err {
                ReservationError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                ReservationError::SeatConflict { seats } => {
                    let body = json!({
                        "error": format!("Seats {} are already booked, please pick other seats", seats.join(", ")),
                        "code": "SEAT_CONFLICT",
                        "seats": seats,
                    });
                    return (StatusCode::CONFLICT, axum::Json(body)).into_response();
                }
                ReservationError::ShowtimeNotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "SHOWTIME_NOT_FOUND",
                    format!("Showtime {id} not found"),
                ),
                ReservationError::InsufficientCapacity { .. } => (
                    StatusCode::CONFLICT,
                    "INSUFFICIENT_CAPACITY",
                    "Not enough seats left for this showtime".to_string(),
                ),
                ReservationError::System(store) => internal(store),
            },
            AppError::EventReservation(err) => match err {
                EventReservationError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                EventReservationError::System(store) => internal(store),
            },
            AppError::Store(store) => internal(store),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}
