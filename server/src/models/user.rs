use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::check_length;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Organizer,
    Visitor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::Visitor => "visitor",
        }
    }

    /// Roles allowed to be the organizer of an event.
    pub fn can_organize(&self) -> bool {
        matches!(self, Role::Admin | Role::Organizer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Registration payload. The password is plaintext until the identity
/// service hashes it into a [`UserRecord`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("username", &self.username, 3, 30)?;
        check_email(&self.email)?;
        check_length("password", &self.password, 1, 128)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(username) = &self.username {
            check_length("username", username, 3, 30)?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        if let Some(password) = &self.password {
            check_length("password", password, 1, 128)?;
        }
        Ok(())
    }
}

/// A user row as handed to the store: credential already hashed.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

fn check_email(email: &str) -> Result<(), AppError> {
    check_length("email", email, 3, 50)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::ValidationError(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}
