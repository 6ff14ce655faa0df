//! Payload of the `locations:update` stream event.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::locations::dtos::LocationResponseDto;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LocationEventKind {
    Create,
    Update,
    Delete,
}

/// `{ type, location, id? }`; delete events carry the last snapshot and the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationEvent {
    #[serde(rename = "type")]
    pub kind: LocationEventKind,
    pub location: Option<LocationResponseDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl LocationEvent {
    pub fn created(location: LocationResponseDto) -> Self {
        Self {
            kind: LocationEventKind::Create,
            location: Some(location),
            id: None,
        }
    }

    pub fn updated(location: LocationResponseDto) -> Self {
        Self {
            kind: LocationEventKind::Update,
            location: Some(location),
            id: None,
        }
    }

    pub fn deleted(snapshot: Option<LocationResponseDto>, id: Uuid) -> Self {
        Self {
            kind: LocationEventKind::Delete,
            location: snapshot,
            id: Some(id),
        }
    }

    /// Id of the affected record: the explicit id, else the snapshot's
    pub fn target_id(&self) -> Option<Uuid> {
        self.id.or_else(|| self.location.as_ref().map(|l| l.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delete_event_wire_shape() {
        let id = Uuid::now_v7();
        let value = serde_json::to_value(LocationEvent::deleted(None, id)).unwrap();
        assert_eq!(
            value,
            json!({ "type": "delete", "location": null, "id": id.to_string() })
        );
    }

    #[test]
    fn test_target_id_falls_back_to_snapshot() {
        let id = Uuid::now_v7();
        let event: LocationEvent = serde_json::from_value(json!({
            "type": "delete",
            "location": {
                "id": id, "name": "Office", "city": null, "address": null,
                "lat": 1.0, "lng": 2.0, "active": true,
                "createdAt": "2025-01-01T00:00:00Z", "updatedAt": "2025-01-01T00:00:00Z"
            }
        }))
        .unwrap();
        assert_eq!(event.target_id(), Some(id));
    }
}
