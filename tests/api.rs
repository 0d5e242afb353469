//! HTTP surface tests: full router over a per-test Postgres database.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

use common::{bearer, body_json, build_test_app, get, post_json, seed_event, seed_showtime, seed_user};

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./src/migrations")]
async fn health_returns_ok(pool: PgPool) {
    let app = build_test_app(pool);
    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// POST /api/bookings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./src/migrations")]
async fn create_booking_requires_token(pool: PgPool) {
    let showtime = seed_showtime(&pool, 100, 90_000).await;
    let app = build_test_app(pool);

    let body = json!({ "showtime_id": showtime, "seats": ["A1"] });
    let response = app.oneshot(post_json("/api/bookings", body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn create_booking_rejects_garbage_token(pool: PgPool) {
    let showtime = seed_showtime(&pool, 100, 90_000).await;
    let app = build_test_app(pool);

    let body = json!({ "showtime_id": showtime, "seats": ["A1"] });
    let response = app
        .oneshot(post_json("/api/bookings", body, Some("Bearer not.a.jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn create_booking_returns_201_then_409(pool: PgPool) {
    let user = seed_user(&pool, "linh").await;
    let showtime = seed_showtime(&pool, 100, 90_000).await;
    let app = build_test_app(pool);
    let auth = bearer(user);

    let body = json!({ "showtime_id": showtime, "seats": ["H8", "H9"] });
    let response = app
        .clone()
        .oneshot(post_json("/api/bookings", body, Some(&auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Booking created");
    assert_eq!(json["totalAmount"], 180_000);
    assert_eq!(json["seats"], json!(["H8", "H9"]));
    assert!(json["bookingId"].as_i64().unwrap() > 0);

    let body = json!({ "showtime_id": showtime, "seats": ["H9", "H10"] });
    let response = app
        .oneshot(post_json("/api/bookings", body, Some(&auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "SEAT_CONFLICT");
    assert_eq!(json["seats"], json!(["H9"]));
}

#[sqlx::test(migrations = "./src/migrations")]
async fn create_booking_unknown_showtime_is_404(pool: PgPool) {
    let user = seed_user(&pool, "phuc").await;
    let app = build_test_app(pool);

    let body = json!({ "showtime_id": 31337, "seats": ["A1"] });
    let response = app
        .oneshot(post_json("/api/bookings", body, Some(&bearer(user))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "SHOWTIME_NOT_FOUND");
}

#[sqlx::test(migrations = "./src/migrations")]
async fn create_booking_with_no_seats_is_400(pool: PgPool) {
    let user = seed_user(&pool, "nam").await;
    let showtime = seed_showtime(&pool, 100, 90_000).await;
    let app = build_test_app(pool);

    let body = json!({ "showtime_id": showtime, "seats": [] });
    let response = app
        .oneshot(post_json("/api/bookings", body, Some(&bearer(user))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn create_booking_with_duplicate_seats_is_400(pool: PgPool) {
    let user = seed_user(&pool, "dung").await;
    let showtime = seed_showtime(&pool, 100, 90_000).await;
    let app = build_test_app(pool);

    let body = json!({ "showtime_id": showtime, "seats": ["A1", "A1"] });
    let response = app
        .oneshot(post_json("/api/bookings", body, Some(&bearer(user))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "./src/migrations")]
async fn create_booking_without_showtime_id_is_400(pool: PgPool) {
    let user = seed_user(&pool, "hai").await;
    let app = build_test_app(pool.clone());

    let body = json!({ "seats": ["A1"] });
    let response = app
        .oneshot(post_json("/api/bookings", body, Some(&bearer(user))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].as_str().unwrap().contains("showtime_id"));
    assert_eq!(common::count_rows(&pool, "bookings").await, 0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn create_booking_with_malformed_fields_is_400(pool: PgPool) {
    let user = seed_user(&pool, "loc").await;
    let showtime = seed_showtime(&pool, 100, 90_000).await;
    let app = build_test_app(pool);
    let auth = bearer(user);

    for body in [
        json!({ "showtime_id": null, "seats": ["A1"] }),
        json!({ "showtime_id": showtime, "seats": "A1" }),
        json!({ "showtime_id": showtime }),
    ] {
        let response = app
            .clone()
            .oneshot(post_json("/api/bookings", body.clone(), Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST", "{body}");
    }
}

// ---------------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./src/migrations")]
async fn showtime_views_reflect_booking(pool: PgPool) {
    let user = seed_user(&pool, "trang").await;
    let showtime = seed_showtime(&pool, 100, 90_000).await;
    let app = build_test_app(pool);

    let body = json!({ "showtime_id": showtime, "seats": ["B2", "B1"] });
    let response = app
        .clone()
        .oneshot(post_json("/api/bookings", body, Some(&bearer(user))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let uri = format!("/api/showtimes/{showtime}/occupied-seats");
    let response = app.clone().oneshot(get(&uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!(["B1", "B2"]));

    let uri = format!("/api/showtimes/{showtime}");
    let response = app.oneshot(get(&uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["available_seats"], 98);
    assert_eq!(json["booked_seats"], 2);
    assert_eq!(json["derived_available_seats"], 98);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn unknown_showtime_view_is_404(pool: PgPool) {
    let app = build_test_app(pool);
    let response = app.oneshot(get("/api/showtimes/999", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn booking_history_lists_own_bookings(pool: PgPool) {
    let me = seed_user(&pool, "me").await;
    let other = seed_user(&pool, "other").await;
    let showtime = seed_showtime(&pool, 100, 90_000).await;
    let app = build_test_app(pool);

    for (user, seat) in [(me, "C1"), (other, "C2")] {
        let body = json!({ "showtime_id": showtime, "seats": [seat] });
        let response = app
            .clone()
            .oneshot(post_json("/api/bookings", body, Some(&bearer(user))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(get("/api/users/me/bookings", Some(&bearer(me))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["seats"], json!(["C1"]));
    assert_eq!(entries[0]["cinema_name"], "CGV Vincom");
}

// ---------------------------------------------------------------------------
// POST /api/events/bookings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./src/migrations")]
async fn event_booking_returns_201(pool: PgPool) {
    let user = seed_user(&pool, "hanh").await;
    let event = seed_event(&pool).await;
    let app = build_test_app(pool);

    let body = json!({ "event_id": event, "number_of_tickets": 2, "total_amount": 500_000 });
    let response = app
        .oneshot(post_json("/api/events/bookings", body, Some(&bearer(user))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["numberOfTickets"], 2);
    assert_eq!(json["totalAmount"], 500_000);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn event_booking_with_zero_tickets_is_400(pool: PgPool) {
    let user = seed_user(&pool, "son").await;
    let event = seed_event(&pool).await;
    let app = build_test_app(pool);

    let body = json!({ "event_id": event, "number_of_tickets": 0, "total_amount": 500_000 });
    let response = app
        .oneshot(post_json("/api/events/bookings", body, Some(&bearer(user))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn event_booking_without_event_id_is_400(pool: PgPool) {
    let user = seed_user(&pool, "thao").await;
    let app = build_test_app(pool.clone());

    let body = json!({ "number_of_tickets": 2, "total_amount": 500_000 });
    let response = app
        .oneshot(post_json("/api/events/bookings", body, Some(&bearer(user))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].as_str().unwrap().contains("event_id"));
    assert_eq!(common::count_rows(&pool, "event_bookings").await, 0);
}
