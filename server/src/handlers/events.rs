use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::models::{EventPatch, NewEvent};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Response, AppError> {
    let events = state.services.events.list(page.offset, page.limit).await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let event = state.services.events.get(event_id).await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn list_events_by_location(
    State(state): State<AppState>,
    Path(location_id): Path<i64>,
) -> Result<Response, AppError> {
    let events = state.services.events.list_by_location(location_id).await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn list_events_by_organizer(
    State(state): State<AppState>,
    Path(organizer_id): Path<i64>,
) -> Result<Response, AppError> {
    let events = state.services.events.list_by_organizer(organizer_id).await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn create_event(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(event): Json<NewEvent>,
) -> Result<Response, AppError> {
    let event = state
        .services
        .events
        .create(&current.caller(), event)
        .await?;
    Ok(created(event, "Event created"))
}

pub async fn update_event(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(event_id): Path<i64>,
    Json(patch): Json<EventPatch>,
) -> Result<Response, AppError> {
    let event = state
        .services
        .events
        .update(&current.caller(), event_id, patch)
        .await?;
    Ok(success(event, "Event updated"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let event = state
        .services
        .events
        .soft_delete(&current.caller(), event_id)
        .await?;
    Ok(success(event, "Event deleted"))
}
