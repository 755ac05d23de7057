use std::sync::Arc;

use tracing::info;

use super::{EventService, TicketService, UserService};
use crate::models::ticket::default_ticket_price;
use crate::models::{Booking, BookingPatch, BookingWithTicket, NewBooking, Ticket};
use crate::policy::{authorize, Action, Caller};
use crate::store::{BookingFilter, Store};
use crate::utils::error::AppError;

/// Booking lifecycle. A booking claims exactly one ticket; removing a
/// booking always removes its ticket too, which gives the slot back to the
/// event.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    users: UserService,
    events: EventService,
    tickets: TicketService,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn Store>,
        users: UserService,
        events: EventService,
        tickets: TicketService,
    ) -> Self {
        Self {
            store,
            users,
            events,
            tickets,
        }
    }

    pub async fn create(&self, caller: &Caller, request: NewBooking) -> Result<Booking, AppError> {
        authorize(caller, Action::ManageAnyBooking)?;
        let ticket = self.tickets.get(request.ticket_id).await?;
        self.users.lookup_by_id(request.user_id).await?;
        ensure_bookable(&ticket)?;

        let booking = self.store.insert_booking(&request).await?;
        info!(
            booking_number = booking.booking_number,
            user_id = booking.user_id,
            ticket_id = booking.ticket_id,
            "Booking created"
        );
        Ok(booking)
    }

    /// Books a freshly allocated seat at the event for the caller.
    pub async fn book_event(&self, caller: &Caller, event_id: i64) -> Result<BookingWithTicket, AppError> {
        authorize(caller, Action::BookEvent)?;
        let headroom = self.tickets.count_available_by_event(event_id).await?;
        if headroom <= 0 {
            return Err(AppError::NoAvailability(format!(
                "No tickets available for event {}",
                event_id
            )));
        }
        let event = self.events.get(event_id).await?;

        let booked = self
            .store
            .book_event(event.id, caller.id, default_ticket_price())
            .await?;
        info!(
            booking_number = booked.booking.booking_number,
            ticket_id = booked.ticket.id,
            event_id,
            user_id = caller.id,
            "Event booked"
        );
        Ok(booked)
    }

    pub async fn get(&self, caller: &Caller, number: i64) -> Result<Booking, AppError> {
        authorize(caller, Action::ReadAnyBooking)?;
        self.find(number).await
    }

    pub async fn list(&self, caller: &Caller) -> Result<Vec<Booking>, AppError> {
        authorize(caller, Action::ReadAnyBooking)?;
        self.store.list_bookings(BookingFilter::All).await
    }

    pub async fn list_mine(&self, caller: &Caller) -> Result<Vec<Booking>, AppError> {
        authorize(caller, Action::ListOwnBookings)?;
        self.store.list_bookings(BookingFilter::User(caller.id)).await
    }

    pub async fn list_by_user(&self, caller: &Caller, user_id: i64) -> Result<Vec<Booking>, AppError> {
        authorize(caller, Action::ReadAnyBooking)?;
        self.store.list_bookings(BookingFilter::User(user_id)).await
    }

    pub async fn list_by_ticket(&self, caller: &Caller, ticket_id: i64) -> Result<Vec<Booking>, AppError> {
        authorize(caller, Action::ReadAnyBooking)?;
        self.store.list_bookings(BookingFilter::Ticket(ticket_id)).await
    }

    pub async fn list_by_event(&self, caller: &Caller, event_id: i64) -> Result<Vec<Booking>, AppError> {
        let event = self.events.get(event_id).await?;
        authorize(
            caller,
            Action::ListEventBookings {
                organizer_id: event.organizer_id,
            },
        )?;
        self.store.list_bookings(BookingFilter::Event(event_id)).await
    }

    pub async fn update(
        &self,
        caller: &Caller,
        number: i64,
        patch: BookingPatch,
    ) -> Result<Booking, AppError> {
        authorize(caller, Action::ManageAnyBooking)?;
        let mut booking = self.find(number).await?;
        if let Some(user_id) = patch.user_id {
            self.users.lookup_by_id(user_id).await?;
        }
        if let Some(ticket_id) = patch.ticket_id {
            if ticket_id != booking.ticket_id {
                ensure_bookable(&self.tickets.get(ticket_id).await?)?;
            }
        }

        booking.apply(patch);
        let booking = self.store.update_booking(&booking).await?;
        info!(booking_number = number, caller_id = caller.id, "Booking updated");
        Ok(booking)
    }

    /// Removes any booking and releases its ticket.
    pub async fn cancel(&self, caller: &Caller, number: i64) -> Result<BookingWithTicket, AppError> {
        authorize(caller, Action::ManageAnyBooking)?;
        self.release(caller, number).await
    }

    /// Removes one of the caller's own bookings and releases its ticket.
    pub async fn delete_own(&self, caller: &Caller, number: i64) -> Result<BookingWithTicket, AppError> {
        let booking = self.find(number).await?;
        authorize(
            caller,
            Action::DeleteOwnBooking {
                owner_id: booking.user_id,
            },
        )?;
        self.release(caller, number).await
    }

    async fn find(&self, number: i64) -> Result<Booking, AppError> {
        self.store
            .booking_by_number(number)
            .await?
            .ok_or_else(|| AppError::not_found("Booking", number))
    }

    async fn release(&self, caller: &Caller, number: i64) -> Result<BookingWithTicket, AppError> {
        let released = self
            .store
            .delete_booking(number)
            .await?
            .ok_or_else(|| AppError::not_found("Booking", number))?;
        info!(
            booking_number = number,
            ticket_id = released.ticket.id,
            event_id = released.ticket.event_id,
            caller_id = caller.id,
            "Booking removed and ticket released"
        );
        Ok(released)
    }
}

fn ensure_bookable(ticket: &Ticket) -> Result<(), AppError> {
    if !ticket.is_active() {
        return Err(AppError::StoreConflict(format!(
            "Ticket {} is cancelled and cannot be booked",
            ticket.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::testing::{admin, concert, hall, seat, services, user};
    use crate::services::Services;

    struct Fixture {
        services: Services,
        admin: Caller,
        organizer: Caller,
        visitor: Caller,
        event_id: i64,
    }

    async fn fixture(capacity: i32) -> Fixture {
        let services = services();
        let admin = admin(&services).await;
        let organizer = user(&services, &admin, "olive", Role::Organizer).await;
        let visitor = user(&services, &admin, "vince", Role::Visitor).await;
        let venue = services.locations.create(&admin, hall("Hall A")).await.unwrap();
        let event = services
            .events
            .create(&organizer, concert(venue.id, organizer.id, capacity))
            .await
            .unwrap();
        Fixture {
            services,
            admin,
            organizer,
            visitor,
            event_id: event.id,
        }
    }

    #[tokio::test]
    async fn test_book_event_consumes_headroom() {
        let f = fixture(2).await;
        let booked = f.services.bookings.book_event(&f.visitor, f.event_id).await.unwrap();
        assert_eq!(booked.booking.user_id, f.visitor.id);
        assert_eq!(booked.ticket.event_id, f.event_id);
        assert_eq!(booked.ticket.price, default_ticket_price());
        assert_eq!(
            f.services.tickets.count_available_by_event(f.event_id).await.unwrap(),
            1
        );

        f.services.bookings.book_event(&f.visitor, f.event_id).await.unwrap();
        let err = f
            .services
            .bookings
            .book_event(&f.visitor, f.event_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoAvailability(_)));
    }

    #[tokio::test]
    async fn test_book_missing_event_is_not_found() {
        let f = fixture(2).await;
        let err = f.services.bookings.book_event(&f.visitor, 404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ticket_cannot_be_booked_twice() {
        let f = fixture(5).await;
        let ticket = f
            .services
            .tickets
            .create(&f.organizer, seat(f.event_id, "A1"))
            .await
            .unwrap();
        let request = NewBooking {
            user_id: f.visitor.id,
            ticket_id: ticket.id,
        };
        f.services.bookings.create(&f.admin, request.clone()).await.unwrap();
        let err = f.services.bookings.create(&f.admin, request).await.unwrap_err();
        assert!(matches!(err, AppError::StoreConflict(_)));
    }

    #[tokio::test]
    async fn test_cancelled_ticket_cannot_be_booked() {
        let f = fixture(5).await;
        let ticket = f
            .services
            .tickets
            .create(&f.organizer, seat(f.event_id, "A1"))
            .await
            .unwrap();
        f.services.tickets.cancel(&f.organizer, ticket.id).await.unwrap();
        let err = f
            .services
            .bookings
            .create(
                &f.admin,
                NewBooking {
                    user_id: f.visitor.id,
                    ticket_id: ticket.id,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StoreConflict(_)));
    }

    #[tokio::test]
    async fn test_create_validates_references() {
        let f = fixture(5).await;
        let missing_ticket = NewBooking {
            user_id: f.visitor.id,
            ticket_id: 9999,
        };
        assert!(matches!(
            f.services.bookings.create(&f.admin, missing_ticket).await,
            Err(AppError::NotFound(_))
        ));

        let ticket = f
            .services
            .tickets
            .create(&f.organizer, seat(f.event_id, "A1"))
            .await
            .unwrap();
        let missing_user = NewBooking {
            user_id: 9999,
            ticket_id: ticket.id,
        };
        assert!(matches!(
            f.services.bookings.create(&f.admin, missing_user).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_releases_ticket() {
        let f = fixture(3).await;
        let booked = f.services.bookings.book_event(&f.visitor, f.event_id).await.unwrap();
        let number = booked.booking.booking_number;

        let released = f.services.bookings.cancel(&f.admin, number).await.unwrap();
        assert_eq!(released.ticket.id, booked.ticket.id);
        assert_eq!(
            f.services.tickets.count_available_by_event(f.event_id).await.unwrap(),
            3
        );
        assert!(matches!(
            f.services.tickets.get(booked.ticket.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.services.bookings.cancel(&f.admin, number).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_own_checks_ownership_after_existence() {
        let f = fixture(3).await;
        let booked = f.services.bookings.book_event(&f.visitor, f.event_id).await.unwrap();
        let number = booked.booking.booking_number;

        let err = f
            .services
            .bookings
            .delete_own(&f.organizer, number)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        f.services.bookings.delete_own(&f.visitor, number).await.unwrap();
        let err = f
            .services
            .bookings
            .delete_own(&f.organizer, number)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_permissions() {
        let f = fixture(3).await;
        let booked = f.services.bookings.book_event(&f.visitor, f.event_id).await.unwrap();
        let bookings = &f.services.bookings;

        assert!(matches!(bookings.list(&f.visitor).await, Err(AppError::Forbidden(_))));
        assert!(matches!(
            bookings.get(&f.organizer, booked.booking.booking_number).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(bookings.list(&f.admin).await.unwrap().len(), 1);
        assert_eq!(bookings.list_mine(&f.visitor).await.unwrap().len(), 1);
        assert!(bookings.list_mine(&f.organizer).await.unwrap().is_empty());
        assert_eq!(
            bookings.list_by_user(&f.admin, f.visitor.id).await.unwrap().len(),
            1
        );
        assert_eq!(
            bookings
                .list_by_ticket(&f.admin, booked.ticket.id)
                .await
                .unwrap()
                .len(),
            1
        );

        // the event's organizer may see its bookings, another organizer may not
        assert_eq!(
            bookings.list_by_event(&f.organizer, f.event_id).await.unwrap().len(),
            1
        );
        let stranger = user(&f.services, &f.admin, "oscar", Role::Organizer).await;
        assert!(matches!(
            bookings.list_by_event(&stranger, f.event_id).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_update_moves_booking_to_free_ticket_only() {
        let f = fixture(5).await;
        let first = f.services.bookings.book_event(&f.visitor, f.event_id).await.unwrap();
        let second = f.services.bookings.book_event(&f.visitor, f.event_id).await.unwrap();
        let spare = f
            .services
            .tickets
            .create(&f.organizer, seat(f.event_id, "Z9"))
            .await
            .unwrap();

        let onto_booked = BookingPatch {
            ticket_id: Some(second.ticket.id),
            ..Default::default()
        };
        assert!(matches!(
            f.services
                .bookings
                .update(&f.admin, first.booking.booking_number, onto_booked)
                .await,
            Err(AppError::StoreConflict(_))
        ));

        let onto_spare = BookingPatch {
            ticket_id: Some(spare.id),
            ..Default::default()
        };
        let moved = f
            .services
            .bookings
            .update(&f.admin, first.booking.booking_number, onto_spare)
            .await
            .unwrap();
        assert_eq!(moved.ticket_id, spare.id);
        assert!(moved.updated_at.is_some());
    }
}
