use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{BookingFilter, EventFilter, Store, TicketFilter};
use crate::models::ticket::seat_label;
use crate::models::{
    Booking, BookingWithTicket, Event, Location, NewBooking, NewEvent, NewLocation, NewTicket,
    Ticket, TicketStatus, User, UserRecord,
};
use crate::utils::error::AppError;

/// In-process store used by the test suite and by the server when no
/// database is configured. Every call holds one lock for its whole
/// duration, which makes composite writes atomic and serializes racing
/// bookings the same way row locks do in PostgreSQL.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    locations: BTreeMap<i64, Location>,
    events: BTreeMap<i64, Event>,
    tickets: BTreeMap<i64, Ticket>,
    bookings: BTreeMap<i64, Booking>,
    last_id: Sequences,
}

#[derive(Default)]
struct Sequences {
    user: i64,
    location: i64,
    event: i64,
    ticket: i64,
    booking: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

fn conflict(message: impl Into<String>) -> AppError {
    AppError::StoreConflict(message.into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn check_user_unique(&self, id: i64, username: &str, email: &str) -> Result<(), AppError> {
        for user in self.users.values().filter(|u| u.id != id) {
            if user.email == email {
                return Err(conflict(format!("email '{}' is already taken", email)));
            }
            if user.username == username {
                return Err(conflict(format!("username '{}' is already taken", username)));
            }
        }
        Ok(())
    }

    fn check_location_name(&self, id: i64, name: &str) -> Result<(), AppError> {
        let taken = self
            .locations
            .values()
            .any(|l| l.id != id && l.is_active() && l.name == name);
        if taken {
            return Err(conflict(format!("location name '{}' is already taken", name)));
        }
        Ok(())
    }

    fn check_event_refs(&self, location_id: i64, organizer_id: i64) -> Result<(), AppError> {
        if !self.locations.contains_key(&location_id) {
            return Err(conflict(format!("location {} does not exist", location_id)));
        }
        if !self.users.contains_key(&organizer_id) {
            return Err(conflict(format!("user {} does not exist", organizer_id)));
        }
        Ok(())
    }

    fn check_booking_refs(&self, number: i64, user_id: i64, ticket_id: i64) -> Result<(), AppError> {
        if !self.users.contains_key(&user_id) {
            return Err(conflict(format!("user {} does not exist", user_id)));
        }
        if !self.tickets.contains_key(&ticket_id) {
            return Err(conflict(format!("ticket {} does not exist", ticket_id)));
        }
        let booked = self
            .bookings
            .values()
            .any(|b| b.booking_number != number && b.ticket_id == ticket_id);
        if booked {
            return Err(conflict(format!("ticket {} is already booked", ticket_id)));
        }
        Ok(())
    }

    fn check_ticket_bookable(&self, ticket_id: i64) -> Result<(), AppError> {
        match self.tickets.get(&ticket_id) {
            Some(ticket) if ticket.is_active() => Ok(()),
            Some(_) => Err(conflict(format!("ticket {} is cancelled", ticket_id))),
            None => Err(conflict(format!("ticket {} does not exist", ticket_id))),
        }
    }

    fn is_booked(&self, ticket_id: i64) -> bool {
        self.bookings.values().any(|b| b.ticket_id == ticket_id)
    }

    fn active_event(&self, event_id: i64) -> Result<&Event, AppError> {
        self.events
            .get(&event_id)
            .filter(|e| e.is_active())
            .ok_or_else(|| AppError::not_found("Event", event_id))
    }

    fn active_ticket_count(&self, event_id: i64) -> i64 {
        self.tickets
            .values()
            .filter(|t| t.event_id == event_id && t.is_active())
            .count() as i64
    }

    fn ensure_headroom(&self, event_id: i64) -> Result<(), AppError> {
        let event = self.active_event(event_id)?;
        if i64::from(event.ticket_capacity) - self.active_ticket_count(event_id) <= 0 {
            return Err(AppError::NoAvailability(format!(
                "No tickets available for event {}",
                event_id
            )));
        }
        Ok(())
    }

    fn push_ticket(&mut self, event_id: i64, seat_num: String, price: Decimal) -> Ticket {
        let ticket = Ticket {
            id: next(&mut self.last_id.ticket),
            event_id,
            seat_num,
            price,
            status: TicketStatus::Active,
            sold_at: Utc::now(),
            cancelled_at: None,
            updated_at: None,
        };
        self.tickets.insert(ticket.id, ticket.clone());
        ticket
    }

    fn push_booking(&mut self, user_id: i64, ticket_id: i64) -> Result<Booking, AppError> {
        self.check_booking_refs(0, user_id, ticket_id)?;
        self.check_ticket_bookable(ticket_id)?;
        let booking = Booking {
            booking_number: next(&mut self.last_id.booking),
            user_id,
            ticket_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.bookings.insert(booking.booking_number, booking.clone());
        Ok(booking)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, record: UserRecord) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;
        tables.check_user_unique(0, &record.username, &record.email)?;
        let user = User {
            id: next(&mut tables.last_id.user),
            username: record.username,
            email: record.email,
            hashed_password: record.hashed_password,
            role: record.role,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.tables.lock().await.users.values().cloned().collect())
    }

    async fn update_user(&self, user: &User) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user.id) {
            return Err(AppError::not_found("User", user.id));
        }
        tables.check_user_unique(user.id, &user.username, &user.email)?;
        let mut stored = user.clone();
        stored.updated_at = Some(Utc::now());
        tables.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_location(&self, new: &NewLocation) -> Result<Location, AppError> {
        let mut tables = self.tables.lock().await;
        tables.check_location_name(0, &new.name)?;
        let location = Location {
            id: next(&mut tables.last_id.location),
            name: new.name.clone(),
            address: new.address.clone(),
            capacity: new.capacity,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        };
        tables.locations.insert(location.id, location.clone());
        Ok(location)
    }

    async fn location_by_id(&self, id: i64) -> Result<Option<Location>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.locations.get(&id).filter(|l| l.is_active()).cloned())
    }

    async fn location_by_name(&self, name: &str) -> Result<Option<Location>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .locations
            .values()
            .find(|l| l.is_active() && l.name == name)
            .cloned())
    }

    async fn list_locations(&self) -> Result<Vec<Location>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .locations
            .values()
            .filter(|l| l.is_active())
            .cloned()
            .collect())
    }

    async fn update_location(&self, location: &Location) -> Result<Location, AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.locations.contains_key(&location.id) {
            return Err(AppError::not_found("Location", location.id));
        }
        if location.is_active() {
            tables.check_location_name(location.id, &location.name)?;
        }
        let mut stored = location.clone();
        stored.updated_at = Some(Utc::now());
        tables.locations.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_event(&self, new: &NewEvent) -> Result<Event, AppError> {
        let mut tables = self.tables.lock().await;
        tables.check_event_refs(new.location_id, new.organizer_id)?;
        let event = Event {
            id: next(&mut tables.last_id.event),
            title: new.title.clone(),
            event_date: new.event_date,
            start_time: new.start_time,
            description: new.description.clone(),
            location_id: new.location_id,
            organizer_id: new.organizer_id,
            ticket_capacity: new.ticket_capacity,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        };
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn event_by_id(&self, id: i64) -> Result<Option<Event>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.events.get(&id).filter(|e| e.is_active()).cloned())
    }

    async fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>, AppError> {
        let tables = self.tables.lock().await;
        let active = tables.events.values().filter(|e| e.is_active());
        let events = match filter {
            EventFilter::Page { offset, limit } => active
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .cloned()
                .collect(),
            EventFilter::Location(id) => active.filter(|e| e.location_id == id).cloned().collect(),
            EventFilter::Organizer(id) => {
                active.filter(|e| e.organizer_id == id).cloned().collect()
            }
        };
        Ok(events)
    }

    async fn update_event(&self, event: &Event) -> Result<Event, AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.events.contains_key(&event.id) {
            return Err(AppError::not_found("Event", event.id));
        }
        tables.check_event_refs(event.location_id, event.organizer_id)?;
        let mut stored = event.clone();
        stored.updated_at = Some(Utc::now());
        tables.events.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_ticket(&self, new: &NewTicket) -> Result<Ticket, AppError> {
        let mut tables = self.tables.lock().await;
        tables.ensure_headroom(new.event_id)?;
        Ok(tables.push_ticket(new.event_id, new.seat_num.clone(), new.price))
    }

    async fn ticket_by_id(&self, id: i64) -> Result<Option<Ticket>, AppError> {
        Ok(self.tables.lock().await.tickets.get(&id).cloned())
    }

    async fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>, AppError> {
        let tables = self.tables.lock().await;
        let tickets = tables.tickets.values().filter(|t| match filter {
            TicketFilter::All => true,
            TicketFilter::Event(id) => t.event_id == id,
            TicketFilter::ActiveForEvent(id) => t.event_id == id && t.is_active(),
        });
        Ok(tickets.cloned().collect())
    }

    async fn count_active_tickets(&self, event_id: i64) -> Result<i64, AppError> {
        Ok(self.tables.lock().await.active_ticket_count(event_id))
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<Ticket, AppError> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.tickets.get(&ticket.id) else {
            return Err(AppError::not_found("Ticket", ticket.id));
        };
        let (was_active, old_event_id) = (current.is_active(), current.event_id);
        if !tables.events.contains_key(&ticket.event_id) {
            return Err(conflict(format!("event {} does not exist", ticket.event_id)));
        }
        if ticket.is_active() && (!was_active || old_event_id != ticket.event_id) {
            tables.ensure_headroom(ticket.event_id)?;
        }
        if was_active && !ticket.is_active() && tables.is_booked(ticket.id) {
            return Err(conflict(format!("ticket {} is held by a booking", ticket.id)));
        }
        let mut stored = ticket.clone();
        stored.updated_at = Some(Utc::now());
        tables.tickets.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_ticket(&self, id: i64) -> Result<Option<Ticket>, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.is_booked(id) {
            return Err(conflict(format!("ticket {} is held by a booking", id)));
        }
        Ok(tables.tickets.remove(&id))
    }

    async fn insert_booking(&self, new: &NewBooking) -> Result<Booking, AppError> {
        let mut tables = self.tables.lock().await;
        tables.push_booking(new.user_id, new.ticket_id)
    }

    async fn booking_by_number(&self, number: i64) -> Result<Option<Booking>, AppError> {
        Ok(self.tables.lock().await.bookings.get(&number).cloned())
    }

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, AppError> {
        let tables = self.tables.lock().await;
        let bookings = tables.bookings.values().filter(|b| match filter {
            BookingFilter::All => true,
            BookingFilter::User(id) => b.user_id == id,
            BookingFilter::Ticket(id) => b.ticket_id == id,
            BookingFilter::Event(id) => tables
                .tickets
                .get(&b.ticket_id)
                .is_some_and(|t| t.event_id == id),
        });
        Ok(bookings.cloned().collect())
    }

    async fn update_booking(&self, booking: &Booking) -> Result<Booking, AppError> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.bookings.get(&booking.booking_number) else {
            return Err(AppError::not_found("Booking", booking.booking_number));
        };
        let moves_ticket = current.ticket_id != booking.ticket_id;
        tables.check_booking_refs(booking.booking_number, booking.user_id, booking.ticket_id)?;
        if moves_ticket {
            tables.check_ticket_bookable(booking.ticket_id)?;
        }
        let mut stored = booking.clone();
        stored.updated_at = Some(Utc::now());
        tables.bookings.insert(stored.booking_number, stored.clone());
        Ok(stored)
    }

    async fn book_event(
        &self,
        event_id: i64,
        user_id: i64,
        price: Decimal,
    ) -> Result<BookingWithTicket, AppError> {
        let mut tables = self.tables.lock().await;
        tables.ensure_headroom(event_id)?;
        if !tables.users.contains_key(&user_id) {
            return Err(conflict(format!("user {} does not exist", user_id)));
        }
        let title = tables.active_event(event_id)?.title.clone();

        let id = tables.last_id.ticket + 1;
        let ticket = tables.push_ticket(event_id, seat_label(&title, id), price);
        let booking = tables.push_booking(user_id, ticket.id)?;
        Ok(BookingWithTicket { booking, ticket })
    }

    async fn delete_booking(&self, number: i64) -> Result<Option<BookingWithTicket>, AppError> {
        let mut tables = self.tables.lock().await;
        let Some(booking) = tables.bookings.remove(&number) else {
            return Ok(None);
        };
        let Some(ticket) = tables.tickets.remove(&booking.ticket_id) else {
            tables.bookings.insert(booking.booking_number, booking);
            return Err(AppError::InternalServerError(format!(
                "booking {} references a missing ticket",
                number
            )));
        };
        Ok(Some(BookingWithTicket { booking, ticket }))
    }
}
