use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{check_length, check_positive, double_option};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub description: Option<String>,
    pub location_id: i64,
    pub organizer_id: i64,
    /// Upper bound on active tickets for this event.
    pub ticket_capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn apply(&mut self, patch: EventPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(event_date) = patch.event_date {
            self.event_date = event_date;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(location_id) = patch.location_id {
            self.location_id = location_id;
        }
        if let Some(organizer_id) = patch.organizer_id {
            self.organizer_id = organizer_id;
        }
        if let Some(ticket_capacity) = patch.ticket_capacity {
            self.ticket_capacity = ticket_capacity;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub description: Option<String>,
    pub location_id: i64,
    pub organizer_id: i64,
    pub ticket_capacity: i32,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("title", &self.title, 5, 100)?;
        check_positive("ticket_capacity", self.ticket_capacity)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    /// Absent leaves the description alone; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub location_id: Option<i64>,
    pub organizer_id: Option<i64>,
    pub ticket_capacity: Option<i32>,
}

impl EventPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            check_length("title", title, 5, 100)?;
        }
        if let Some(ticket_capacity) = self.ticket_capacity {
            check_positive("ticket_capacity", ticket_capacity)?;
        }
        Ok(())
    }
}
