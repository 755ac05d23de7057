use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::auth::CurrentUser;
use crate::models::{NewUser, UserPatch};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn register_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(candidate): Json<NewUser>,
) -> Result<Response, AppError> {
    let user = state
        .services
        .users
        .register(&current.caller(), candidate)
        .await?;
    Ok(created(user, "User registered"))
}

pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let users = state.services.users.list(&current.caller()).await?;
    Ok(success(users, "Users retrieved"))
}

pub async fn get_user(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    let user = state.services.users.lookup_by_id(user_id).await?;
    Ok(success(user, "User retrieved"))
}

pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<i64>,
    Json(patch): Json<UserPatch>,
) -> Result<Response, AppError> {
    let user = state
        .services
        .users
        .update(&current.caller(), user_id, patch)
        .await?;
    Ok(success(user, "User updated"))
}
