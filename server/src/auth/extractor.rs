use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::models::User;
use crate::policy::Caller;
use crate::state::AppState;
use crate::utils::error::AppError;

/// The user behind the request's bearer token. Loaded from the store on
/// every request, so the role is always current.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn caller(&self) -> Caller {
        Caller::from(&self.0)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let unauthorized = || AppError::AuthError("Could not validate credentials".to_string());

        let token = bearer_token(&parts.headers).ok_or_else(unauthorized)?;
        let user_id = state.sessions.resolve(token).await.ok_or_else(unauthorized)?;
        match state.services.users.lookup_by_id(user_id).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(AppError::NotFound(_)) => Err(unauthorized()),
            Err(e) => Err(e),
        }
    }
}
