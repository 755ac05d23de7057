use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::auth::CurrentUser;
use crate::models::{LocationPatch, NewLocation};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn list_locations(State(state): State<AppState>) -> Result<Response, AppError> {
    let locations = state.services.locations.list().await?;
    Ok(success(locations, "Locations retrieved"))
}

pub async fn get_location(
    State(state): State<AppState>,
    Path(location_id): Path<i64>,
) -> Result<Response, AppError> {
    let location = state.services.locations.get(location_id).await?;
    Ok(success(location, "Location retrieved"))
}

pub async fn create_location(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(location): Json<NewLocation>,
) -> Result<Response, AppError> {
    let location = state
        .services
        .locations
        .create(&current.caller(), location)
        .await?;
    Ok(created(location, "Location created"))
}

pub async fn update_location(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(location_id): Path<i64>,
    Json(patch): Json<LocationPatch>,
) -> Result<Response, AppError> {
    let location = state
        .services
        .locations
        .update(&current.caller(), location_id, patch)
        .await?;
    Ok(success(location, "Location updated"))
}

pub async fn delete_location(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(location_id): Path<i64>,
) -> Result<Response, AppError> {
    let location = state
        .services
        .locations
        .soft_delete(&current.caller(), location_id)
        .await?;
    Ok(success(location, "Location deleted"))
}
