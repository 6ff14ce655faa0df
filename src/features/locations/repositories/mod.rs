mod pg_location_repository;

#[cfg(test)]
mod memory_location_repository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::locations::models::{Location, LocationPatch, NewLocation};

pub use pg_location_repository::PgLocationRepository;

#[cfg(test)]
pub use memory_location_repository::InMemoryLocationRepository;

/// Persistence for map locations
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// All locations, most recently updated first
    async fn list(&self) -> Result<Vec<Location>>;

    /// Insert with a fresh id; `created_at` and `updated_at` set to now
    async fn insert(&self, location: NewLocation) -> Result<Location>;

    /// Apply the patch and refresh `updated_at`; `None` when no row matched
    async fn update(&self, id: Uuid, patch: LocationPatch) -> Result<Option<Location>>;

    /// Remove the row and return its last state; `None` when no row matched
    async fn delete(&self, id: Uuid) -> Result<Option<Location>>;
}
