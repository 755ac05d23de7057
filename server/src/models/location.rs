use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{check_length, check_positive};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Location {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn apply(&mut self, patch: LocationPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = capacity;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    pub capacity: i32,
}

impl NewLocation {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("name", &self.name, 5, 50)?;
        check_length("address", &self.address, 5, 200)?;
        check_positive("capacity", self.capacity)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<i32>,
}

impl LocationPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            check_length("name", name, 5, 50)?;
        }
        if let Some(address) = &self.address {
            check_length("address", address, 5, 200)?;
        }
        if let Some(capacity) = self.capacity {
            check_positive("capacity", capacity)?;
        }
        Ok(())
    }
}
