use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use shared::Booking;
use uuid::Uuid;

use crate::error::ReservationError;
use crate::reservation::ReservationService;

#[derive(Clone)]
pub struct AppState {
    pub reservations: ReservationService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub event_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub booking_details: Booking,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "OK",
            error: None,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "ERROR",
            error: Some(message.into()),
            data: None,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

pub async fn create_booking(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<BookingDetails>>), ApiError> {
    let Json(request) = parse_body(&body)?;
    let user_id = parse_id(&request.user_id, "userId")?;
    let event_id = parse_id(&request.event_id, "eventId")?;

    match state.reservations.reserve(user_id, event_id).await {
        Ok(booking) => Ok((
            StatusCode::CREATED,
            Json(ApiResponse::ok(BookingDetails {
                booking_details: booking,
            })),
        )),
        Err(e) => Err((status_for(&e), Json(ApiResponse::error(e.to_string())))),
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}

/// The body is decoded by hand so that every malformed request gets the
/// same error envelope, whatever its content type.
fn parse_body(body: &[u8]) -> Result<Json<CreateBookingRequest>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(bad_request("empty body"));
    }
    Json::from_bytes(body).map_err(|rejection: JsonRejection| {
        bad_request(format!("invalid request body: {}", rejection.body_text()))
    })
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid, ApiError> {
    if raw.trim().is_empty() {
        return Err(bad_request(format!("{} is required", field)));
    }
    Uuid::parse_str(raw.trim()).map_err(|_| bad_request(format!("invalid {}", field)))
}

pub fn status_for(err: &ReservationError) -> StatusCode {
    match err {
        ReservationError::EventNotFound { .. } => StatusCode::NOT_FOUND,
        ReservationError::SoldOut { .. } => StatusCode::CONFLICT,
        ReservationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ReservationError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ReservationError::InconsistentState { .. } | ReservationError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::ReservationConfig;
    use crate::store::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use shared::{Event, EventStatus};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with_event(available_seats: i32) -> (Router, Uuid) {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: "Stand-up Night".to_string(),
            description: String::new(),
            location: "Cellar".to_string(),
            starts_at: now,
            price: BigDecimal::from(20),
            total_seats: 1,
            available_seats,
            status: EventStatus::Active,
            category: "comedy".to_string(),
            image_url: "https://example.com/cellar.png".to_string(),
            organizer_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let store = MemoryStore::new();
        store.insert_event(event.clone());
        let reservations = ReservationService::new(Arc::new(store), ReservationConfig::default());
        (create_router(AppState { reservations }), event.id)
    }

    async fn post_booking(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        post_raw(app, body.to_string()).await
    }

    async fn post_raw(app: Router, body: impl Into<Body>) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/bookings")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn booking_is_created() {
        let (app, event_id) = app_with_event(1);
        let user_id = Uuid::new_v4();

        let (status, body) = post_booking(
            app,
            serde_json::json!({ "userId": user_id, "eventId": event_id }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "OK");
        let details = &body["data"]["bookingDetails"];
        assert_eq!(details["userId"], user_id.to_string());
        assert_eq!(details["tickets"], 1);
        assert_eq!(details["status"], "confirmed");
    }

    #[tokio::test]
    async fn sold_out_is_a_conflict() {
        let (app, event_id) = app_with_event(0);

        let (status, body) = post_booking(
            app,
            serde_json::json!({ "userId": Uuid::new_v4(), "eventId": event_id }),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], "ERROR");
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let (app, _) = app_with_event(1);

        let (status, _) = post_booking(
            app,
            serde_json::json!({ "userId": Uuid::new_v4(), "eventId": Uuid::new_v4() }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_ids_are_rejected() {
        let (app, event_id) = app_with_event(1);

        let (status, body) = post_booking(
            app.clone(),
            serde_json::json!({ "userId": "not-a-uuid", "eventId": event_id }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid userId");

        let (status, body) = post_booking(
            app.clone(),
            serde_json::json!({ "userId": Uuid::new_v4(), "eventId": "42" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid eventId");

        let (status, body) = post_booking(app, serde_json::json!({ "userId": Uuid::new_v4() })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "eventId is required");
    }

    #[tokio::test]
    async fn unreadable_bodies_get_the_error_envelope() {
        let (app, _) = app_with_event(1);

        let (status, body) = post_raw(app.clone(), Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "ERROR");
        assert_eq!(body["error"], "empty body");

        let (status, body) = post_raw(app, "userId=1&eventId=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "ERROR");
        assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app_with_event(1);
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
