use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::LocationRepository;
use crate::core::error::{AppError, Result};
use crate::features::locations::models::{Location, LocationPatch, NewLocation};

const LOCATION_COLUMNS: &str =
    "id, name, city, address, lat, lng, active, created_at, updated_at";

/// Postgres-backed repository over the `map_locations` table
pub struct PgLocationRepository {
    pool: PgPool,
}

impl PgLocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepository for PgLocationRepository {
    async fn list(&self) -> Result<Vec<Location>> {
        let query = format!(
            "SELECT {} FROM map_locations ORDER BY updated_at DESC, id DESC",
            LOCATION_COLUMNS
        );

        sqlx::query_as::<_, Location>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list locations: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn insert(&self, location: NewLocation) -> Result<Location> {
        let query = format!(
            r#"
            INSERT INTO map_locations (id, name, city, address, lat, lng, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {}
            "#,
            LOCATION_COLUMNS
        );

        sqlx::query_as::<_, Location>(&query)
            .bind(Uuid::now_v7())
            .bind(location.name)
            .bind(location.city)
            .bind(location.address)
            .bind(location.lat)
            .bind(location.lng)
            .bind(location.active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert location: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn update(&self, id: Uuid, patch: LocationPatch) -> Result<Option<Location>> {
        // updated_at always moves forward, even when NOW() has not advanced
        let query = format!(
            r#"
            UPDATE map_locations
            SET name = COALESCE($2, name),
                city = COALESCE($3, city),
                address = COALESCE($4, address),
                lat = COALESCE($5, lat),
                lng = COALESCE($6, lng),
                active = COALESCE($7, active),
                updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING {}
            "#,
            LOCATION_COLUMNS
        );

        sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .bind(patch.name)
            .bind(patch.city)
            .bind(patch.address)
            .bind(patch.lat)
            .bind(patch.lng)
            .bind(patch.active)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update location {}: {:?}", id, e);
                AppError::Database(e)
            })
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Location>> {
        let query = format!(
            "DELETE FROM map_locations WHERE id = $1 RETURNING {}",
            LOCATION_COLUMNS
        );

        sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete location {}: {:?}", id, e);
                AppError::Database(e)
            })
    }
}
