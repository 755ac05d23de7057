use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Ticket;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub booking_number: i64,
    pub user_id: i64,
    pub ticket_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn apply(&mut self, patch: BookingPatch) {
        if let Some(user_id) = patch.user_id {
            self.user_id = user_id;
        }
        if let Some(ticket_id) = patch.ticket_id {
            self.ticket_id = ticket_id;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub user_id: i64,
    pub ticket_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    pub user_id: Option<i64>,
    pub ticket_id: Option<i64>,
}

/// A booking together with the ticket it claims. Returned when a booking is
/// made through `book_event` and when a booking is removed along with its
/// ticket.
#[derive(Debug, Clone, Serialize)]
pub struct BookingWithTicket {
    pub booking: Booking,
    pub ticket: Ticket,
}
