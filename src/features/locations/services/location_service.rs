use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::locations::dtos::{
    CreateLocationDto, DeletedLocationDto, LocationResponseDto, UpdateLocationDto,
};
use crate::features::locations::events::LocationEvent;
use crate::features::locations::repositories::LocationRepository;
use crate::modules::realtime::Broadcaster;
use crate::shared::constants::EVENT_LOCATIONS_UPDATE;

/// Location CRUD; every successful mutation is published to stream subscribers
pub struct LocationService {
    repository: Arc<dyn LocationRepository>,
    broadcaster: Arc<Broadcaster>,
    store_timeout: Duration,
}

impl LocationService {
    pub fn new(
        repository: Arc<dyn LocationRepository>,
        broadcaster: Arc<Broadcaster>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            broadcaster,
            store_timeout,
        }
    }

    /// Bound a repository call by the store timeout
    ///
    /// On expiry the call is abandoned, so a write may still have committed.
    /// Nothing is published for it; clients reconcile on their next list fetch.
    async fn bounded<T>(&self, operation: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "Store call '{}' exceeded {:?}; outcome unknown",
                    operation,
                    self.store_timeout
                );
                Err(AppError::Timeout("Store operation timed out".to_string()))
            }
        }
    }

    fn not_found(id: Uuid) -> AppError {
        AppError::NotFound(format!("Location {} not found", id))
    }

    /// All locations, most recently updated first
    pub async fn list(&self) -> Result<Vec<LocationResponseDto>> {
        let locations = self.bounded("list", self.repository.list()).await?;
        Ok(locations.into_iter().map(LocationResponseDto::from).collect())
    }

    pub async fn create(&self, dto: CreateLocationDto) -> Result<LocationResponseDto> {
        let new_location = dto.into_new_location()?;

        let created = self
            .bounded("insert", self.repository.insert(new_location))
            .await?;
        let created = LocationResponseDto::from(created);
        tracing::info!(location_id = %created.id, "Location created");

        self.broadcaster.publish(
            EVENT_LOCATIONS_UPDATE,
            &LocationEvent::created(created.clone()),
        );
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, dto: UpdateLocationDto) -> Result<LocationResponseDto> {
        let patch = dto.into_patch()?;

        let updated = self
            .bounded("update", self.repository.update(id, patch))
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        let updated = LocationResponseDto::from(updated);
        tracing::info!(location_id = %id, "Location updated");

        self.broadcaster.publish(
            EVENT_LOCATIONS_UPDATE,
            &LocationEvent::updated(updated.clone()),
        );
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<DeletedLocationDto> {
        let snapshot = self
            .bounded("delete", self.repository.delete(id))
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        tracing::info!(location_id = %id, "Location deleted");

        self.broadcaster.publish(
            EVENT_LOCATIONS_UPDATE,
            &LocationEvent::deleted(Some(snapshot.into()), id),
        );
        Ok(DeletedLocationDto { id })
    }
}
