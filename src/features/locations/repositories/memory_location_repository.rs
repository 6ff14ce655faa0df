use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::LocationRepository;
use crate::core::error::Result;
use crate::features::locations::models::{Location, LocationPatch, NewLocation};

/// Repository kept in memory, for service and handler tests
#[derive(Default)]
pub struct InMemoryLocationRepository {
    rows: RwLock<HashMap<Uuid, Location>>,
}

impl InMemoryLocationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocationRepository for InMemoryLocationRepository {
    async fn list(&self) -> Result<Vec<Location>> {
        let mut rows: Vec<Location> = self.rows.read().await.values().cloned().collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn insert(&self, location: NewLocation) -> Result<Location> {
        let row = location.into_location(Uuid::now_v7(), Utc::now());
        self.rows.write().await.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: LocationPatch) -> Result<Option<Location>> {
        let mut rows = self.rows.write().await;
        Ok(rows.get_mut(&id).map(|row| {
            patch.apply_to(row, Utc::now());
            row.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Location>> {
        Ok(self.rows.write().await.remove(&id))
    }
}
