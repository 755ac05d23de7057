use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};

use super::{BookingFilter, EventFilter, Store, TicketFilter};
use crate::models::ticket::seat_label;
use crate::models::{
    Booking, BookingWithTicket, Event, Location, NewBooking, NewEvent, NewLocation, NewTicket,
    Ticket, TicketStatus, User, UserRecord,
};
use crate::utils::error::{from_store, AppError};

const USER_COLUMNS: &str = "id, username, email, hashed_password, role, created_at, updated_at";
const LOCATION_COLUMNS: &str = "id, name, address, capacity, created_at, updated_at, deleted_at";
const EVENT_COLUMNS: &str = "id, title, event_date, start_time, description, location_id, \
     organizer_id, ticket_capacity, created_at, updated_at, deleted_at";
const TICKET_COLUMNS: &str =
    "id, event_id, seat_num, price, status, sold_at, cancelled_at, updated_at";
const BOOKING_COLUMNS: &str = "booking_number, user_id, ticket_id, created_at, updated_at";

/// [`Store`] backed by PostgreSQL. Composite writes run in one transaction
/// and hold a row lock on the event while its headroom is re-counted.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| AppError::InternalServerError(format!("migration failed: {}", e)))
    }
}

/// Locks the event row and fails unless another active ticket fits.
/// Returns the event title.
async fn lock_headroom(conn: &mut PgConnection, event_id: i64) -> Result<String, AppError> {
    let row: Option<(String, i32)> = sqlx::query_as(
        "SELECT title, ticket_capacity FROM events \
         WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(event_id)
    .fetch_optional(&mut *conn)
    .await?;
    let (title, capacity) = row.ok_or_else(|| AppError::not_found("Event", event_id))?;

    let (active,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND status = 'active'",
    )
    .bind(event_id)
    .fetch_one(&mut *conn)
    .await?;

    if i64::from(capacity) - active <= 0 {
        return Err(AppError::NoAvailability(format!(
            "No tickets available for event {}",
            event_id
        )));
    }
    Ok(title)
}

/// Locks the ticket row and fails unless it exists and is still active.
async fn lock_bookable_ticket(conn: &mut PgConnection, ticket_id: i64) -> Result<(), AppError> {
    let row: Option<(TicketStatus,)> =
        sqlx::query_as("SELECT status FROM tickets WHERE id = $1 FOR UPDATE")
            .bind(ticket_id)
            .fetch_optional(&mut *conn)
            .await?;
    match row {
        Some((TicketStatus::Active,)) => Ok(()),
        Some((TicketStatus::Cancelled,)) => Err(AppError::StoreConflict(format!(
            "ticket {} is cancelled",
            ticket_id
        ))),
        None => Err(AppError::StoreConflict(format!(
            "ticket {} does not exist",
            ticket_id
        ))),
    }
}

async fn insert_ticket_row(
    conn: &mut PgConnection,
    event_id: i64,
    seat_num: &str,
    price: Decimal,
) -> Result<Ticket, AppError> {
    sqlx::query_as::<_, Ticket>(&format!(
        "INSERT INTO tickets (event_id, seat_num, price) VALUES ($1, $2, $3) RETURNING {}",
        TICKET_COLUMNS
    ))
    .bind(event_id)
    .bind(seat_num)
    .bind(price)
    .fetch_one(&mut *conn)
    .await
    .map_err(from_store)
}

async fn insert_booking_row(
    conn: &mut PgConnection,
    user_id: i64,
    ticket_id: i64,
) -> Result<Booking, AppError> {
    sqlx::query_as::<_, Booking>(&format!(
        "INSERT INTO bookings (user_id, ticket_id) VALUES ($1, $2) RETURNING {}",
        BOOKING_COLUMNS
    ))
    .bind(user_id)
    .bind(ticket_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(from_store)
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, record: UserRecord) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, hashed_password, role) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.hashed_password)
        .bind(record.role)
        .fetch_one(&self.pool)
        .await
        .map_err(from_store)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET username = $2, email = $3, hashed_password = $4, role = $5, \
             updated_at = now() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(user.role)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_store)?
        .ok_or_else(|| AppError::not_found("User", user.id))
    }

    async fn insert_location(&self, new: &NewLocation) -> Result<Location, AppError> {
        sqlx::query_as::<_, Location>(&format!(
            "INSERT INTO locations (name, address, capacity) VALUES ($1, $2, $3) RETURNING {}",
            LOCATION_COLUMNS
        ))
        .bind(&new.name)
        .bind(&new.address)
        .bind(new.capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(from_store)
    }

    async fn location_by_id(&self, id: i64) -> Result<Option<Location>, AppError> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "SELECT {} FROM locations WHERE id = $1 AND deleted_at IS NULL",
            LOCATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    async fn location_by_name(&self, name: &str) -> Result<Option<Location>, AppError> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "SELECT {} FROM locations WHERE name = $1 AND deleted_at IS NULL",
            LOCATION_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    async fn list_locations(&self) -> Result<Vec<Location>, AppError> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            "SELECT {} FROM locations WHERE deleted_at IS NULL ORDER BY id",
            LOCATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(locations)
    }

    async fn update_location(&self, location: &Location) -> Result<Location, AppError> {
        sqlx::query_as::<_, Location>(&format!(
            "UPDATE locations SET name = $2, address = $3, capacity = $4, deleted_at = $5, \
             updated_at = now() WHERE id = $1 RETURNING {}",
            LOCATION_COLUMNS
        ))
        .bind(location.id)
        .bind(&location.name)
        .bind(&location.address)
        .bind(location.capacity)
        .bind(location.deleted_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_store)?
        .ok_or_else(|| AppError::not_found("Location", location.id))
    }

    async fn insert_event(&self, new: &NewEvent) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events (title, event_date, start_time, description, location_id, \
             organizer_id, ticket_capacity) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(&new.title)
        .bind(new.event_date)
        .bind(new.start_time)
        .bind(&new.description)
        .bind(new.location_id)
        .bind(new.organizer_id)
        .bind(new.ticket_capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(from_store)
    }

    async fn event_by_id(&self, id: i64) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1 AND deleted_at IS NULL",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>, AppError> {
        let base = format!("SELECT {} FROM events WHERE deleted_at IS NULL", EVENT_COLUMNS);
        let events = match filter {
            EventFilter::Page { offset, limit } => {
                sqlx::query_as::<_, Event>(&format!("{} ORDER BY id OFFSET $1 LIMIT $2", base))
                    .bind(offset)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            EventFilter::Location(id) => {
                sqlx::query_as::<_, Event>(&format!("{} AND location_id = $1 ORDER BY id", base))
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            EventFilter::Organizer(id) => {
                sqlx::query_as::<_, Event>(&format!("{} AND organizer_id = $1 ORDER BY id", base))
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(events)
    }

    async fn update_event(&self, event: &Event) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET title = $2, event_date = $3, start_time = $4, description = $5, \
             location_id = $6, organizer_id = $7, ticket_capacity = $8, deleted_at = $9, \
             updated_at = now() WHERE id = $1 RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(event.event_date)
        .bind(event.start_time)
        .bind(&event.description)
        .bind(event.location_id)
        .bind(event.organizer_id)
        .bind(event.ticket_capacity)
        .bind(event.deleted_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_store)?
        .ok_or_else(|| AppError::not_found("Event", event.id))
    }

    async fn insert_ticket(&self, new: &NewTicket) -> Result<Ticket, AppError> {
        let mut tx = self.pool.begin().await?;
        lock_headroom(&mut tx, new.event_id).await?;
        let ticket = insert_ticket_row(&mut tx, new.event_id, &new.seat_num, new.price).await?;
        tx.commit().await?;
        Ok(ticket)
    }

    async fn ticket_by_id(&self, id: i64) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {} FROM tickets WHERE id = $1",
            TICKET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>, AppError> {
        let base = format!("SELECT {} FROM tickets", TICKET_COLUMNS);
        let tickets = match filter {
            TicketFilter::All => {
                sqlx::query_as::<_, Ticket>(&format!("{} ORDER BY id", base))
                    .fetch_all(&self.pool)
                    .await?
            }
            TicketFilter::Event(id) => {
                sqlx::query_as::<_, Ticket>(&format!("{} WHERE event_id = $1 ORDER BY id", base))
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            TicketFilter::ActiveForEvent(id) => {
                sqlx::query_as::<_, Ticket>(&format!(
                    "{} WHERE event_id = $1 AND status = 'active' ORDER BY id",
                    base
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(tickets)
    }

    async fn count_active_tickets(&self, event_id: i64) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND status = 'active'",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<Ticket, AppError> {
        let mut tx = self.pool.begin().await?;
        let current: Option<(i64, TicketStatus)> =
            sqlx::query_as("SELECT event_id, status FROM tickets WHERE id = $1 FOR UPDATE")
                .bind(ticket.id)
                .fetch_optional(&mut *tx)
                .await?;
        let (old_event_id, old_status) =
            current.ok_or_else(|| AppError::not_found("Ticket", ticket.id))?;
        let was_active = old_status == TicketStatus::Active;

        if ticket.is_active() && (!was_active || old_event_id != ticket.event_id) {
            lock_headroom(&mut tx, ticket.event_id).await?;
        }
        if was_active && !ticket.is_active() {
            let (booked,): (bool,) =
                sqlx::query_as("SELECT EXISTS (SELECT 1 FROM bookings WHERE ticket_id = $1)")
                    .bind(ticket.id)
                    .fetch_one(&mut *tx)
                    .await?;
            if booked {
                return Err(AppError::StoreConflict(format!(
                    "ticket {} is held by a booking",
                    ticket.id
                )));
            }
        }

        let updated = sqlx::query_as::<_, Ticket>(&format!(
            "UPDATE tickets SET event_id = $2, seat_num = $3, price = $4, status = $5, \
             cancelled_at = $6, updated_at = now() WHERE id = $1 RETURNING {}",
            TICKET_COLUMNS
        ))
        .bind(ticket.id)
        .bind(ticket.event_id)
        .bind(&ticket.seat_num)
        .bind(ticket.price)
        .bind(ticket.status)
        .bind(ticket.cancelled_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(from_store)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_ticket(&self, id: i64) -> Result<Option<Ticket>, AppError> {
        sqlx::query_as::<_, Ticket>(&format!(
            "DELETE FROM tickets WHERE id = $1 RETURNING {}",
            TICKET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_store)
    }

    async fn insert_booking(&self, new: &NewBooking) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await?;
        lock_bookable_ticket(&mut tx, new.ticket_id).await?;
        let booking = insert_booking_row(&mut tx, new.user_id, new.ticket_id).await?;
        tx.commit().await?;
        Ok(booking)
    }

    async fn booking_by_number(&self, number: i64) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {} FROM bookings WHERE booking_number = $1",
            BOOKING_COLUMNS
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, AppError> {
        let base = format!("SELECT {} FROM bookings", BOOKING_COLUMNS);
        let bookings = match filter {
            BookingFilter::All => {
                sqlx::query_as::<_, Booking>(&format!("{} ORDER BY booking_number", base))
                    .fetch_all(&self.pool)
                    .await?
            }
            BookingFilter::User(id) => {
                sqlx::query_as::<_, Booking>(&format!(
                    "{} WHERE user_id = $1 ORDER BY booking_number",
                    base
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            BookingFilter::Ticket(id) => {
                sqlx::query_as::<_, Booking>(&format!(
                    "{} WHERE ticket_id = $1 ORDER BY booking_number",
                    base
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            BookingFilter::Event(id) => {
                sqlx::query_as::<_, Booking>(
                    "SELECT b.booking_number, b.user_id, b.ticket_id, b.created_at, b.updated_at \
                     FROM bookings b JOIN tickets t ON t.id = b.ticket_id \
                     WHERE t.event_id = $1 ORDER BY b.booking_number",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(bookings)
    }

    async fn update_booking(&self, booking: &Booking) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await?;
        let current: Option<(i64,)> =
            sqlx::query_as("SELECT ticket_id FROM bookings WHERE booking_number = $1 FOR UPDATE")
                .bind(booking.booking_number)
                .fetch_optional(&mut *tx)
                .await?;
        let (old_ticket_id,) =
            current.ok_or_else(|| AppError::not_found("Booking", booking.booking_number))?;
        if old_ticket_id != booking.ticket_id {
            lock_bookable_ticket(&mut tx, booking.ticket_id).await?;
        }

        let updated = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET user_id = $2, ticket_id = $3, updated_at = now() \
             WHERE booking_number = $1 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(booking.booking_number)
        .bind(booking.user_id)
        .bind(booking.ticket_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(from_store)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn book_event(
        &self,
        event_id: i64,
        user_id: i64,
        price: Decimal,
    ) -> Result<BookingWithTicket, AppError> {
        let mut tx = self.pool.begin().await?;
        let title = lock_headroom(&mut tx, event_id).await?;

        let placeholder = insert_ticket_row(&mut tx, event_id, "pending", price).await?;
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "UPDATE tickets SET seat_num = $2 WHERE id = $1 RETURNING {}",
            TICKET_COLUMNS
        ))
        .bind(placeholder.id)
        .bind(seat_label(&title, placeholder.id))
        .fetch_one(&mut *tx)
        .await
        .map_err(from_store)?;

        let booking = insert_booking_row(&mut tx, user_id, ticket.id).await?;
        tx.commit().await?;
        Ok(BookingWithTicket { booking, ticket })
    }

    async fn delete_booking(&self, number: i64) -> Result<Option<BookingWithTicket>, AppError> {
        let mut tx = self.pool.begin().await?;
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "DELETE FROM bookings WHERE booking_number = $1 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(number)
        .fetch_optional(&mut *tx)
        .await
        .map_err(from_store)?;
        let Some(booking) = booking else {
            return Ok(None);
        };

        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "DELETE FROM tickets WHERE id = $1 RETURNING {}",
            TICKET_COLUMNS
        ))
        .bind(booking.ticket_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(from_store)?;

        tx.commit().await?;
        Ok(Some(BookingWithTicket { booking, ticket }))
    }
}
