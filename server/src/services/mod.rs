//! Domain services. Every invariant and authorization check lives here;
//! handlers only translate between HTTP and these calls.

use std::sync::Arc;

use crate::auth::credentials::CredentialHasher;
use crate::store::Store;

pub mod bookings;
pub mod events;
pub mod locations;
pub mod tickets;
pub mod users;

pub use bookings::BookingService;
pub use events::EventService;
pub use locations::LocationService;
pub use tickets::TicketService;
pub use users::UserService;

#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub locations: LocationService,
    pub events: EventService,
    pub tickets: TicketService,
    pub bookings: BookingService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, hasher: Arc<dyn CredentialHasher>) -> Self {
        let users = UserService::new(store.clone(), hasher);
        let locations = LocationService::new(store.clone());
        let events = EventService::new(store.clone(), users.clone(), locations.clone());
        let tickets = TicketService::new(store.clone(), events.clone());
        let bookings = BookingService::new(store, users.clone(), events.clone(), tickets.clone());
        Self {
            users,
            locations,
            events,
            tickets,
            bookings,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;

    use super::Services;
    use crate::auth::credentials::Argon2Hasher;
    use crate::models::{NewEvent, NewLocation, NewTicket, NewUser, Role};
    use crate::policy::Caller;
    use crate::store::MemoryStore;

    pub fn services() -> Services {
        Services::new(Arc::new(MemoryStore::new()), Arc::new(Argon2Hasher::fast()))
    }

    pub async fn admin(services: &Services) -> Caller {
        let admin = services
            .users
            .bootstrap_admin("admin", "admin@example.com", "admin-pass")
            .await
            .unwrap();
        Caller::from(&admin)
    }

    pub async fn user(services: &Services, admin: &Caller, name: &str, role: Role) -> Caller {
        let user = services
            .users
            .register(
                admin,
                NewUser {
                    username: name.to_string(),
                    email: format!("{}@example.com", name),
                    password: "password".to_string(),
                    role,
                },
            )
            .await
            .unwrap();
        Caller::from(&user)
    }

    pub fn hall(name: &str) -> NewLocation {
        NewLocation {
            name: name.to_string(),
            address: "1 Concourse Road".to_string(),
            capacity: 100,
        }
    }

    pub fn concert(location_id: i64, organizer_id: i64, ticket_capacity: i32) -> NewEvent {
        NewEvent {
            title: "Autumn Concert".to_string(),
            event_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            description: Some("Strings and brass".to_string()),
            location_id,
            organizer_id,
            ticket_capacity,
        }
    }

    pub fn seat(event_id: i64, seat_num: &str) -> NewTicket {
        NewTicket {
            event_id,
            seat_num: seat_num.to_string(),
            price: Decimal::new(40, 0),
        }
    }
}
