use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Database model for a map location
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Location {
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

/// Validated fields for a row about to be inserted
#[derive(Debug, Clone, Validate)]
pub struct NewLocation {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 200))]
    pub city: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    pub active: bool,
}

/// Partial update; `None` leaves the column as it is
#[derive(Debug, Clone, Default, Validate)]
pub struct LocationPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub city: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    pub active: Option<bool>,
}

impl NewLocation {
    pub fn into_location(self, id: Uuid, now: DateTime<Utc>) -> Location {
        Location {
            id,
            name: self.name,
            city: self.city,
            address: self.address,
            lat: self.lat,
            lng: self.lng,
            active: self.active,
            created_at: now,
            updated_at: now,
        }
    }
}

impl LocationPatch {
    /// Apply the supplied fields and refresh `updated_at`
    pub fn apply_to(self, location: &mut Location, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            location.name = name;
        }
        if let Some(city) = self.city {
            location.city = Some(city);
        }
        if let Some(address) = self.address {
            location.address = Some(address);
        }
        if let Some(lat) = self.lat {
            location.lat = lat;
        }
        if let Some(lng) = self.lng {
            location.lng = lng;
        }
        if let Some(active) = self.active {
            location.active = active;
        }
        location.updated_at = next_updated_at(location.updated_at, now);
    }
}

/// `updated_at` after a mutation: `now`, but always strictly after the previous value
pub fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    if now > floor {
        now
    } else {
        floor
    }
}
