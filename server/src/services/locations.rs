use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::models::{Location, LocationPatch, NewLocation};
use crate::policy::{authorize, Action, Caller};
use crate::store::Store;
use crate::utils::error::AppError;

/// Venue catalog.
#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn Store>,
}

impl LocationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, caller: &Caller, location: NewLocation) -> Result<Location, AppError> {
        authorize(caller, Action::ManageLocation)?;
        location.validate()?;
        self.ensure_name_free(&location.name, None).await?;

        let location = self.store.insert_location(&location).await?;
        info!(location_id = location.id, name = %location.name, "Location created");
        Ok(location)
    }

    /// Soft-deleted locations are reported as missing.
    pub async fn get(&self, id: i64) -> Result<Location, AppError> {
        self.store
            .location_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Location", id))
    }

    pub async fn list(&self) -> Result<Vec<Location>, AppError> {
        self.store.list_locations().await
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: i64,
        patch: LocationPatch,
    ) -> Result<Location, AppError> {
        authorize(caller, Action::ManageLocation)?;
        patch.validate()?;
        let mut location = self.get(id).await?;
        if let Some(name) = &patch.name {
            self.ensure_name_free(name, Some(id)).await?;
        }

        location.apply(patch);
        let location = self.store.update_location(&location).await?;
        info!(location_id = id, "Location updated");
        Ok(location)
    }

    pub async fn soft_delete(&self, caller: &Caller, id: i64) -> Result<Location, AppError> {
        authorize(caller, Action::ManageLocation)?;
        let mut location = self.get(id).await?;
        location.deleted_at = Some(Utc::now());

        let location = self.store.update_location(&location).await?;
        info!(location_id = id, "Location soft-deleted");
        Ok(location)
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i64>) -> Result<(), AppError> {
        match self.store.location_by_name(name).await? {
            Some(existing) if Some(existing.id) != except => Err(AppError::DuplicateName(format!(
                "Location with name '{}' already exists",
                name
            ))),
            _ => Ok(()),
        }
    }
}
