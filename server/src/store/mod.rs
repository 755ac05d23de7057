//! Persistence seam. The services only talk to [`Store`]; integrity rules
//! that must hold under concurrent requests (uniqueness, ticket capacity,
//! one booking per ticket) are enforced by the implementations at the write
//! boundary and surfaced as [`AppError::StoreConflict`] or
//! [`AppError::NoAvailability`].

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::{
    Booking, BookingWithTicket, Event, Location, NewBooking, NewEvent, NewLocation, NewTicket,
    Ticket, User, UserRecord,
};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    Page { offset: i64, limit: i64 },
    Location(i64),
    Organizer(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketFilter {
    All,
    Event(i64),
    ActiveForEvent(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingFilter {
    All,
    User(i64),
    Ticket(i64),
    Event(i64),
}

/// Lookups of locations and events only ever see rows without a
/// soft-delete marker. Update methods write back the whole row and bump
/// `updated_at`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, record: UserRecord) -> Result<User, AppError>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn update_user(&self, user: &User) -> Result<User, AppError>;

    async fn insert_location(&self, new: &NewLocation) -> Result<Location, AppError>;
    async fn location_by_id(&self, id: i64) -> Result<Option<Location>, AppError>;
    async fn location_by_name(&self, name: &str) -> Result<Option<Location>, AppError>;
    async fn list_locations(&self) -> Result<Vec<Location>, AppError>;
    async fn update_location(&self, location: &Location) -> Result<Location, AppError>;

    async fn insert_event(&self, new: &NewEvent) -> Result<Event, AppError>;
    async fn event_by_id(&self, id: i64) -> Result<Option<Event>, AppError>;
    async fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>, AppError>;
    async fn update_event(&self, event: &Event) -> Result<Event, AppError>;

    /// Inserts an active ticket. Re-checks the event's headroom atomically
    /// with the insert: `NotFound` for a missing or soft-deleted event,
    /// `NoAvailability` when every slot is taken.
    async fn insert_ticket(&self, new: &NewTicket) -> Result<Ticket, AppError>;
    async fn ticket_by_id(&self, id: i64) -> Result<Option<Ticket>, AppError>;
    async fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>, AppError>;
    async fn count_active_tickets(&self, event_id: i64) -> Result<i64, AppError>;
    async fn update_ticket(&self, ticket: &Ticket) -> Result<Ticket, AppError>;
    /// Physically removes a ticket. `StoreConflict` while a booking holds it.
    async fn delete_ticket(&self, id: i64) -> Result<Option<Ticket>, AppError>;

    /// `StoreConflict` if the ticket is already booked or a reference is
    /// dangling.
    async fn insert_booking(&self, new: &NewBooking) -> Result<Booking, AppError>;
    async fn booking_by_number(&self, number: i64) -> Result<Option<Booking>, AppError>;
    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, AppError>;
    async fn update_booking(&self, booking: &Booking) -> Result<Booking, AppError>;

    /// Allocates a fresh ticket for the event and books it for the user in a
    /// single transaction. Nothing is written if any step fails.
    async fn book_event(
        &self,
        event_id: i64,
        user_id: i64,
        price: Decimal,
    ) -> Result<BookingWithTicket, AppError>;

    /// Removes the booking and the ticket it holds in a single transaction.
    async fn delete_booking(&self, number: i64) -> Result<Option<BookingWithTicket>, AppError>;
}
