use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::error::ApiError;
use super::validation::validate_id;
use crate::db::{
    AuthUser, Booking, BookingListQuery, BookingWithRoom, CreateBookingRequest,
    UpdateBookingRequest,
};
use crate::AppState;

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// Malformed ids can never match a row
fn booking_id(id: &str) -> Result<(), ApiError> {
    validate_id(id, "id").map_err(|_| ApiError::not_found("Booking not found"))
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let req = json_body(body)?;
    let booking = state.bookings.create(&user, req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<BookingWithRoom>>, ApiError> {
    Ok(Json(state.bookings.list(&user, query).await?))
}

pub async fn list_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BookingWithRoom>>, ApiError> {
    validate_id(&user_id, "userId").map_err(|e| ApiError::validation_field("userId", e))?;
    Ok(Json(state.bookings.list_for_user(&user, &user_id).await?))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Booking>, ApiError> {
    booking_id(&id)?;
    Ok(Json(state.bookings.get(&user, &id).await?))
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateBookingRequest>, JsonRejection>,
) -> Result<Json<Booking>, ApiError> {
    booking_id(&id)?;
    let patch = json_body(body)?;
    Ok(Json(state.bookings.update(&user, &id, patch).await?))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Booking>, ApiError> {
    booking_id(&id)?;
    Ok(Json(state.bookings.cancel(&user, &id).await?))
}

pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    booking_id(&id)?;
    state.bookings.delete(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
