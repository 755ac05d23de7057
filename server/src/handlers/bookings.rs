use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::auth::CurrentUser;
use crate::models::{BookingPatch, NewBooking};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn list_bookings(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let bookings = state.services.bookings.list(&current.caller()).await?;
    Ok(success(bookings, "Bookings retrieved"))
}

pub async fn create_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<NewBooking>,
) -> Result<Response, AppError> {
    let booking = state
        .services
        .bookings
        .create(&current.caller(), request)
        .await?;
    Ok(created(booking, "Booking created"))
}

pub async fn list_my_bookings(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let bookings = state.services.bookings.list_mine(&current.caller()).await?;
    Ok(success(bookings, "Bookings retrieved"))
}

pub async fn delete_my_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(booking_number): Path<i64>,
) -> Result<Response, AppError> {
    let released = state
        .services
        .bookings
        .delete_own(&current.caller(), booking_number)
        .await?;
    Ok(success(released, "Booking deleted"))
}

pub async fn book_event(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let booked = state
        .services
        .bookings
        .book_event(&current.caller(), event_id)
        .await?;
    Ok(created(booked, "Event booked"))
}

pub async fn list_bookings_by_event(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let bookings = state
        .services
        .bookings
        .list_by_event(&current.caller(), event_id)
        .await?;
    Ok(success(bookings, "Bookings retrieved"))
}

pub async fn list_bookings_by_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    let bookings = state
        .services
        .bookings
        .list_by_user(&current.caller(), user_id)
        .await?;
    Ok(success(bookings, "Bookings retrieved"))
}

pub async fn list_bookings_by_ticket(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(ticket_id): Path<i64>,
) -> Result<Response, AppError> {
    let bookings = state
        .services
        .bookings
        .list_by_ticket(&current.caller(), ticket_id)
        .await?;
    Ok(success(bookings, "Bookings retrieved"))
}

pub async fn get_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(booking_number): Path<i64>,
) -> Result<Response, AppError> {
    let booking = state
        .services
        .bookings
        .get(&current.caller(), booking_number)
        .await?;
    Ok(success(booking, "Booking retrieved"))
}

pub async fn update_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(booking_number): Path<i64>,
    Json(patch): Json<BookingPatch>,
) -> Result<Response, AppError> {
    let booking = state
        .services
        .bookings
        .update(&current.caller(), booking_number, patch)
        .await?;
    Ok(success(booking, "Booking updated"))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(booking_number): Path<i64>,
) -> Result<Response, AppError> {
    let released = state
        .services
        .bookings
        .cancel(&current.caller(), booking_number)
        .await?;
    Ok(success(released, "Booking deleted"))
}
