use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::check_length;
use crate::utils::error::AppError;

/// Price of a ticket allocated by `book_event`.
pub fn default_ticket_price() -> Decimal {
    Decimal::new(2500, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub event_id: i64,
    pub seat_num: String,
    pub price: Decimal,
    pub status: TicketStatus,
    pub sold_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn is_active(&self) -> bool {
        self.status == TicketStatus::Active
    }

    /// Moves the ticket to `Cancelled`. Returns false if it already was,
    /// leaving the first cancellation time in place.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = TicketStatus::Cancelled;
        self.cancelled_at = Some(at);
        true
    }

    pub fn apply(&mut self, patch: TicketPatch) {
        if let Some(event_id) = patch.event_id {
            self.event_id = event_id;
        }
        if let Some(seat_num) = patch.seat_num {
            self.seat_num = seat_num;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
    }
}

/// Seat label for a ticket allocated on behalf of a visitor.
pub fn seat_label(event_title: &str, ticket_id: i64) -> String {
    format!("{}-{}", event_title, ticket_id)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub event_id: i64,
    pub seat_num: String,
    pub price: Decimal,
}

impl NewTicket {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("seat_num", &self.seat_num, 1, 50)?;
        check_price(self.price)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPatch {
    pub event_id: Option<i64>,
    pub seat_num: Option<String>,
    pub price: Option<Decimal>,
}

impl TicketPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(seat_num) = &self.seat_num {
            check_length("seat_num", seat_num, 1, 50)?;
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        Ok(())
    }
}

fn check_price(price: Decimal) -> Result<(), AppError> {
    if price.is_sign_negative() {
        return Err(AppError::ValidationError(
            "price must not be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ticket() -> Ticket {
        Ticket {
            id: 7,
            event_id: 1,
            seat_num: "A1".to_string(),
            price: default_ticket_price(),
            status: TicketStatus::Active,
            sold_at: Utc::now(),
            cancelled_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_default_price_is_twenty_five() {
        assert_eq!(default_ticket_price(), Decimal::new(25, 0));
    }

    #[test]
    fn test_cancel_keeps_first_timestamp() {
        let mut ticket = sample_ticket();
        let first = Utc::now();
        assert!(ticket.cancel(first));
        assert!(!ticket.cancel(first + chrono::Duration::seconds(5)));
        assert_eq!(ticket.status, TicketStatus::Cancelled);
        assert_eq!(ticket.cancelled_at, Some(first));
    }

    #[test]
    fn test_seat_label_uses_title_and_id() {
        assert_eq!(seat_label("Spring Concert", 42), "Spring Concert-42");
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let ticket = NewTicket {
            event_id: 1,
            seat_num: "B2".to_string(),
            price: Decimal::new(-1, 0),
        };
        assert!(ticket.validate().is_err());
    }
}
