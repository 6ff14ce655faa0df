use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::locations::models::{Location, LocationPatch, NewLocation};

const REQUIRED_FIELDS_MESSAGE: &str = "name, lat, lng are required";

/// A coordinate as sent by clients: a JSON number or a numeric string
///
/// Any other JSON value is kept as `Other` so it fails field validation
/// instead of body parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Coordinate {
    /// Finite numeric value, if there is one
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            Coordinate::Number(n) => *n,
            Coordinate::Text(s) => s.trim().parse::<f64>().ok()?,
            Coordinate::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for Coordinate {
    fn from(value: f64) -> Self {
        Coordinate::Number(value)
    }
}

// Create request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateLocationDto {
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub lat: Option<Coordinate>,
    pub lng: Option<Coordinate>,
    /// Defaults to true unless explicitly false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl CreateLocationDto {
    /// Trim, check required fields and ranges
    pub fn into_new_location(self) -> Result<NewLocation> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let lat = self.lat.as_ref().and_then(Coordinate::to_f64);
        let lng = self.lng.as_ref().and_then(Coordinate::to_f64);

        let (Some(name), Some(lat), Some(lng)) = (name, lat, lng) else {
            return Err(AppError::Validation(REQUIRED_FIELDS_MESSAGE.to_string()));
        };

        let location = NewLocation {
            name,
            city: self.city.filter(|c| !c.is_empty()),
            address: self.address.filter(|a| !a.is_empty()),
            lat,
            lng,
            active: self.active != Some(false),
        };
        location
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(location)
    }
}

// Update request; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateLocationDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl UpdateLocationDto {
    pub fn into_patch(self) -> Result<LocationPatch> {
        let name = match self.name {
            Some(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation("name must not be empty".to_string()));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };

        let patch = LocationPatch {
            name,
            city: self.city,
            address: self.address,
            lat: parse_optional_coordinate("lat", self.lat)?,
            lng: parse_optional_coordinate("lng", self.lng)?,
            active: self.active,
        };
        patch
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(patch)
    }
}

fn parse_optional_coordinate(field: &str, value: Option<Coordinate>) -> Result<Option<f64>> {
    match value {
        Some(coordinate) => coordinate
            .to_f64()
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("{} must be a number", field))),
        None => Ok(None),
    }
}

// Response DTO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponseDto {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Location> for LocationResponseDto {
    fn from(l: Location) -> Self {
        Self {
            id: l.id,
            name: l.name,
            city: l.city,
            address: l.address,
            lat: l.lat,
            lng: l.lng,
            active: l.active,
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

/// Body of a successful delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeletedLocationDto {
    pub id: Uuid,
}
