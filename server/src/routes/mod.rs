use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{auth, bookings, events, health_check, locations, tickets, users};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/users/me", get(auth::me))
        .route("/users/register", post(users::register_user))
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user).put(users::update_user))
        .route(
            "/locations",
            get(locations::list_locations).post(locations::create_location),
        )
        .route(
            "/locations/:id",
            get(locations::get_location)
                .put(locations::update_location)
                .delete(locations::delete_location),
        )
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/location/:id", get(events::list_events_by_location))
        .route("/events/organizer/:id", get(events::list_events_by_organizer))
        .route(
            "/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route("/tickets/:id/cancel", post(tickets::cancel_ticket))
        .route("/tickets/event/:id", get(tickets::list_tickets_by_event))
        .route(
            "/tickets/event/:id/available",
            get(tickets::list_available_tickets_by_event),
        )
        .route(
            "/tickets/event/:id/available/count",
            get(tickets::count_available_tickets_by_event),
        )
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/bookings/me", get(bookings::list_my_bookings))
        .route("/bookings/me/:number", delete(bookings::delete_my_booking))
        .route(
            "/bookings/event/:id",
            get(bookings::list_bookings_by_event).post(bookings::book_event),
        )
        .route("/bookings/user/:id", get(bookings::list_bookings_by_user))
        .route("/bookings/ticket/:id", get(bookings::list_bookings_by_ticket))
        .route(
            "/bookings/:number",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::cancel_booking),
        )
        .with_state(state);

    create_security_headers_layer(config.production)
        .into_iter()
        .fold(api, |router, layer| router.layer(layer))
        .layer(create_cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}
