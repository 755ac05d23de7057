pub mod booking;
pub mod event;
pub mod location;
pub mod ticket;
pub mod user;

pub use booking::{Booking, BookingPatch, BookingWithTicket, NewBooking};
pub use event::{Event, EventPatch, NewEvent};
pub use location::{Location, LocationPatch, NewLocation};
pub use ticket::{NewTicket, Ticket, TicketPatch, TicketStatus};
pub use user::{NewUser, Role, User, UserPatch, UserRecord};

use serde::{Deserialize, Deserializer};

use crate::utils::error::AppError;

pub(crate) fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::ValidationError(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

pub(crate) fn check_positive(field: &str, value: i32) -> Result<(), AppError> {
    if value < 1 {
        return Err(AppError::ValidationError(format!(
            "{} must be at least 1",
            field
        )));
    }
    Ok(())
}

/// Deserializes a nullable patch field so an explicit `null` is kept apart
/// from an absent key. Pair with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
