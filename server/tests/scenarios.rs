use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use booking_server::auth::Argon2Hasher;
use booking_server::models::{NewBooking, NewEvent, NewLocation, NewTicket, NewUser, Role};
use booking_server::policy::Caller;
use booking_server::services::Services;
use booking_server::store::MemoryStore;
use booking_server::utils::error::AppError;

fn services() -> Services {
    Services::new(Arc::new(MemoryStore::new()), Arc::new(Argon2Hasher::fast()))
}

async fn admin(services: &Services) -> Caller {
    let admin = services
        .users
        .bootstrap_admin("admin", "admin@example.com", "admin-pass")
        .await
        .unwrap();
    Caller::from(&admin)
}

async fn register(services: &Services, admin: &Caller, name: &str, role: Role) -> Caller {
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

fn location(name: &str) -> NewLocation {
    NewLocation {
        name: name.to_string(),
        address: "12 Riverside Walk".to_string(),
        capacity: 100,
    }
}

fn event(location_id: i64, organizer_id: i64, ticket_capacity: i32) -> NewEvent {
    NewEvent {
        title: "Harvest Festival".to_string(),
        event_date: NaiveDate::from_ymd_opt(2026, 12, 5).unwrap(),
        start_time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
        description: None,
        location_id,
        organizer_id,
        ticket_capacity,
    }
}

#[tokio::test]
async fn test_visitor_books_event_and_headroom_drops() {
    let services = services();
    let admin = admin(&services).await;
    let hall = services.locations.create(&admin, location("Main Hall")).await.unwrap();
    let organizer = register(&services, &admin, "organizer", Role::Organizer).await;
    let event = services
        .events
        .create(&organizer, event(hall.id, organizer.id, 50))
        .await
        .unwrap();
    assert_eq!(services.tickets.count_available_by_event(event.id).await.unwrap(), 50);

    let visitor = register(&services, &admin, "visitor", Role::Visitor).await;
    let booked = services.bookings.book_event(&visitor, event.id).await.unwrap();

    assert_eq!(booked.booking.ticket_id, booked.ticket.id);
    assert_eq!(booked.booking.user_id, visitor.id);
    assert_eq!(booked.ticket.event_id, event.id);
    assert_eq!(booked.ticket.price, Decimal::new(2500, 2));
    assert_eq!(services.tickets.count_available_by_event(event.id).await.unwrap(), 49);
}

#[tokio::test]
async fn test_visitor_cannot_create_location() {
    let services = services();
    let admin = admin(&services).await;
    let visitor = register(&services, &admin, "visitor", Role::Visitor).await;

    let err = services
        .locations
        .create(&visitor, location("Side Room"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(services.locations.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_location_name_is_rejected() {
    let services = services();
    let admin = admin(&services).await;
    services.locations.create(&admin, location("Hall A")).await.unwrap();

    let err = services
        .locations
        .create(&admin, location("Hall A"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateName(_)));
}

#[tokio::test]
async fn test_booking_missing_ticket_is_not_found() {
    let services = services();
    let admin = admin(&services).await;

    let err = services
        .bookings
        .create(
            &admin,
            NewBooking {
                user_id: admin.id,
                ticket_id: 9999,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_own_booking_deletion_releases_ticket() {
    let services = services();
    let admin = admin(&services).await;
    let hall = services.locations.create(&admin, location("Main Hall")).await.unwrap();
    let organizer = register(&services, &admin, "organizer", Role::Organizer).await;
    let event = services
        .events
        .create(&organizer, event(hall.id, organizer.id, 10))
        .await
        .unwrap();
    let alice = register(&services, &admin, "alice", Role::Visitor).await;
    let bob = register(&services, &admin, "bob", Role::Visitor).await;

    let kept = services.bookings.book_event(&alice, event.id).await.unwrap();
    let deleted = services.bookings.book_event(&alice, event.id).await.unwrap();
    assert_eq!(services.tickets.count_available_by_event(event.id).await.unwrap(), 8);

    let number = deleted.booking.booking_number;
    let released = services.bookings.delete_own(&alice, number).await.unwrap();
    assert_eq!(released.ticket.id, deleted.ticket.id);
    assert_eq!(services.tickets.count_available_by_event(event.id).await.unwrap(), 9);
    assert!(matches!(
        services.tickets.get(deleted.ticket.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));

    let err = services.bookings.delete_own(&bob, number).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services
        .bookings
        .delete_own(&organizer, kept.booking.booking_number)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(services.bookings.list_mine(&alice).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_bookings_for_one_ticket_admit_one() {
    let services = services();
    let admin = admin(&services).await;
    let hall = services.locations.create(&admin, location("Main Hall")).await.unwrap();
    let event = services
        .events
        .create(&admin, event(hall.id, admin.id, 5))
        .await
        .unwrap();
    let ticket = services
        .tickets
        .create(
            &admin,
            NewTicket {
                event_id: event.id,
                seat_num: "A1".to_string(),
                price: Decimal::new(30, 0),
            },
        )
        .await
        .unwrap();

    let ticket_id = ticket.id;
    let mut handles = Vec::new();
    for name in ["carol", "dave", "erin", "frank"] {
        let user = register(&services, &admin, name, Role::Visitor).await;
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services
                .bookings
                .create(
                    &admin,
                    NewBooking {
                        user_id: user.id,
                        ticket_id,
                    },
                )
                .await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(e) => assert!(matches!(e, AppError::StoreConflict(_))),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(services.bookings.list_by_ticket(&admin, ticket_id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_book_event_never_oversells() {
    let services = services();
    let admin = admin(&services).await;
    let hall = services.locations.create(&admin, location("Main Hall")).await.unwrap();
    let event = services
        .events
        .create(&admin, event(hall.id, admin.id, 3))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let user = register(&services, &admin, &format!("guest{}", i), Role::Visitor).await;
        let services = services.clone();
        let event_id = event.id;
        handles.push(tokio::spawn(async move {
            services.bookings.book_event(&user, event_id).await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(e) => assert!(matches!(e, AppError::NoAvailability(_))),
        }
    }
    assert_eq!(admitted, 3);
    assert_eq!(services.tickets.count_available_by_event(event.id).await.unwrap(), 0);
}
