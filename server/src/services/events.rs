use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::{LocationService, UserService};
use crate::models::{Event, EventPatch, NewEvent};
use crate::policy::{authorize, Action, Caller};
use crate::store::{EventFilter, Store};
use crate::utils::error::AppError;

pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// Event catalog.
#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn Store>,
    users: UserService,
    locations: LocationService,
}

impl EventService {
    pub fn new(store: Arc<dyn Store>, users: UserService, locations: LocationService) -> Self {
        Self {
            store,
            users,
            locations,
        }
    }

    pub async fn create(&self, caller: &Caller, event: NewEvent) -> Result<Event, AppError> {
        authorize(
            caller,
            Action::CreateEvent {
                organizer_id: event.organizer_id,
            },
        )?;
        event.validate()?;
        self.check_organizer(event.organizer_id).await?;
        self.locations.get(event.location_id).await?;

        let event = self.store.insert_event(&event).await?;
        info!(
            event_id = event.id,
            organizer_id = event.organizer_id,
            capacity = event.ticket_capacity,
            "Event created"
        );
        Ok(event)
    }

    pub async fn get(&self, id: i64) -> Result<Event, AppError> {
        self.store
            .event_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Event", id))
    }

    pub async fn list(&self, offset: Option<i64>, limit: Option<i64>) -> Result<Vec<Event>, AppError> {
        let offset = offset.unwrap_or(0).max(0);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(0, DEFAULT_PAGE_LIMIT);
        self.store.list_events(EventFilter::Page { offset, limit }).await
    }

    pub async fn list_by_location(&self, location_id: i64) -> Result<Vec<Event>, AppError> {
        self.store.list_events(EventFilter::Location(location_id)).await
    }

    pub async fn list_by_organizer(&self, organizer_id: i64) -> Result<Vec<Event>, AppError> {
        self.store.list_events(EventFilter::Organizer(organizer_id)).await
    }

    pub async fn update(&self, caller: &Caller, id: i64, patch: EventPatch) -> Result<Event, AppError> {
        let mut event = self.get(id).await?;
        authorize(
            caller,
            Action::ManageEvent {
                organizer_id: event.organizer_id,
            },
        )?;
        patch.validate()?;

        if let Some(organizer_id) = patch.organizer_id {
            if organizer_id != event.organizer_id {
                authorize(caller, Action::CreateEvent { organizer_id })?;
            }
            self.check_organizer(organizer_id).await?;
        }
        if let Some(location_id) = patch.location_id {
            self.locations.get(location_id).await?;
        }

        event.apply(patch);
        let event = self.store.update_event(&event).await?;
        info!(event_id = id, caller_id = caller.id, "Event updated");
        Ok(event)
    }

    pub async fn soft_delete(&self, caller: &Caller, id: i64) -> Result<Event, AppError> {
        let mut event = self.get(id).await?;
        authorize(
            caller,
            Action::ManageEvent {
                organizer_id: event.organizer_id,
            },
        )?;
        event.deleted_at = Some(Utc::now());

        let event = self.store.update_event(&event).await?;
        info!(event_id = id, caller_id = caller.id, "Event soft-deleted");
        Ok(event)
    }

    async fn check_organizer(&self, organizer_id: i64) -> Result<(), AppError> {
        let organizer = self.users.lookup_by_id(organizer_id).await?;
        if !organizer.role.can_organize() {
            return Err(AppError::WrongRole(format!(
                "User '{}' is not an organizer",
                organizer.username
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::testing::{admin, concert, hall, services, user};

    #[tokio::test]
    async fn test_visitor_organizer_is_wrong_role() {
        let services = services();
        let admin = admin(&services).await;
        let venue = services.locations.create(&admin, hall("Hall A")).await.unwrap();
        let visitor = user(&services, &admin, "vince", Role::Visitor).await;

        let err = services
            .events
            .create(&admin, concert(venue.id, visitor.id, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WrongRole(_)));

        let organizer = user(&services, &admin, "olive", Role::Organizer).await;
        services
            .events
            .create(&admin, concert(venue.id, organizer.id, 10))
            .await
            .unwrap();
        services
            .events
            .create(&admin, concert(venue.id, admin.id, 10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_organizer_can_only_create_for_self() {
        let services = services();
        let admin = admin(&services).await;
        let venue = services.locations.create(&admin, hall("Hall A")).await.unwrap();
        let olive = user(&services, &admin, "olive", Role::Organizer).await;
        let oscar = user(&services, &admin, "oscar", Role::Organizer).await;

        let err = services
            .events
            .create(&olive, concert(venue.id, oscar.id, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        services
            .events
            .create(&olive, concert(venue.id, olive.id, 10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deleted_location_cannot_host_new_event() {
        let services = services();
        let admin = admin(&services).await;
        let venue = services.locations.create(&admin, hall("Hall A")).await.unwrap();
        services.locations.soft_delete(&admin, venue.id).await.unwrap();

        let err = services
            .events
            .create(&admin, concert(venue.id, admin.id, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_updates_event() {
        let services = services();
        let admin = admin(&services).await;
        let venue = services.locations.create(&admin, hall("Hall A")).await.unwrap();
        let olive = user(&services, &admin, "olive", Role::Organizer).await;
        let oscar = user(&services, &admin, "oscar", Role::Organizer).await;
        let event = services
            .events
            .create(&olive, concert(venue.id, olive.id, 10))
            .await
            .unwrap();

        let patch = EventPatch {
            ticket_capacity: Some(20),
            ..Default::default()
        };
        let err = services
            .events
            .update(&oscar, event.id, patch.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = services.events.update(&olive, event.id, patch).await.unwrap();
        assert_eq!(updated.ticket_capacity, 20);

        // handing the event to someone else is an admin decision
        let handover = EventPatch {
            organizer_id: Some(oscar.id),
            ..Default::default()
        };
        let err = services
            .events
            .update(&olive, event.id, handover.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let moved = services.events.update(&admin, event.id, handover).await.unwrap();
        assert_eq!(moved.organizer_id, oscar.id);
    }

    #[tokio::test]
    async fn test_update_revalidates_organizer_role() {
        let services = services();
        let admin = admin(&services).await;
        let venue = services.locations.create(&admin, hall("Hall A")).await.unwrap();
        let visitor = user(&services, &admin, "vince", Role::Visitor).await;
        let event = services
            .events
            .create(&admin, concert(venue.id, admin.id, 10))
            .await
            .unwrap();

        let patch = EventPatch {
            organizer_id: Some(visitor.id),
            ..Default::default()
        };
        let err = services.events.update(&admin, event.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::WrongRole(_)));
    }

    #[tokio::test]
    async fn test_soft_deleted_events_are_hidden_from_reads() {
        let services = services();
        let admin = admin(&services).await;
        let venue = services.locations.create(&admin, hall("Hall A")).await.unwrap();
        let kept = services
            .events
            .create(&admin, concert(venue.id, admin.id, 10))
            .await
            .unwrap();
        let gone = services
            .events
            .create(&admin, concert(venue.id, admin.id, 10))
            .await
            .unwrap();
        services.events.soft_delete(&admin, gone.id).await.unwrap();

        let listed = services.events.list(None, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept.id);
        assert_eq!(services.events.list_by_location(venue.id).await.unwrap().len(), 1);
        assert_eq!(services.events.list_by_organizer(admin.id).await.unwrap().len(), 1);
        assert!(matches!(
            services.events.get(gone.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            services.events.soft_delete(&admin, gone.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_paginated() {
        let services = services();
        let admin = admin(&services).await;
        let venue = services.locations.create(&admin, hall("Hall A")).await.unwrap();
        for _ in 0..5 {
            services
                .events
                .create(&admin, concert(venue.id, admin.id, 10))
                .await
                .unwrap();
        }

        let page = services.events.list(Some(1), Some(2)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, 2);
        assert_eq!(services.events.list(Some(4), None).await.unwrap().len(), 1);
    }
}
