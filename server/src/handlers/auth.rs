use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::extractor::bearer_token;
use crate::auth::CurrentUser;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
struct TokenPayload {
    access_token: String,
    token_type: &'static str,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let user = state
        .services
        .users
        .authenticate(&request.email, &request.password)
        .await?
        .ok_or_else(|| AppError::AuthError("Incorrect email or password".to_string()))?;

    let access_token = state.sessions.issue(user.id).await;
    info!(user_id = user.id, "User logged in");
    Ok(success(
        TokenPayload {
            access_token,
            token_type: "bearer",
        },
        "Login successful",
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token).await;
    }
    info!(user_id = user.id, "User logged out");
    Ok(success((), "Logged out"))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Response {
    success(user, "Current user")
}
