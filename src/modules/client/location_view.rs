use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::features::locations::dtos::LocationResponseDto;
use crate::features::locations::events::{LocationEvent, LocationEventKind};

/// Client-side copy of the location set
///
/// Upserts never replace a record with an older `updated_at`, so a list fetch
/// racing a live event cannot roll a record back. Deleted ids keep a
/// tombstone so a late create or update cannot bring them back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationView {
    records: HashMap<Uuid, LocationResponseDto>,
    /// Last `updated_at` known for each deleted id
    tombstones: HashMap<Uuid, DateTime<Utc>>,
}

impl LocationView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&LocationResponseDto> {
        self.records.get(id)
    }

    /// Replace the whole view with a freshly fetched list
    pub fn replace_all(&mut self, locations: Vec<LocationResponseDto>) {
        self.records = locations.into_iter().map(|l| (l.id, l)).collect();
        self.tombstones.clear();
    }

    /// Insert or replace unless the held copy is newer. Returns whether the view changed.
    pub fn upsert(&mut self, location: LocationResponseDto) -> bool {
        if self
            .tombstones
            .get(&location.id)
            .is_some_and(|deleted_at| location.updated_at <= *deleted_at)
        {
            return false;
        }
        if let Some(existing) = self.records.get(&location.id) {
            if existing.updated_at > location.updated_at || *existing == location {
                return false;
            }
        }
        self.records.insert(location.id, location);
        true
    }

    pub fn remove(&mut self, id: &Uuid) -> bool {
        self.delete(*id, None)
    }

    /// Drop a record and remember it as deleted as of `deleted_at`
    ///
    /// Without a timestamp the held copy's `updated_at` is used, and failing
    /// that every later version of the id is refused.
    fn delete(&mut self, id: Uuid, deleted_at: Option<DateTime<Utc>>) -> bool {
        let removed = self.records.remove(&id);
        let deleted_at = deleted_at
            .or_else(|| removed.as_ref().map(|l| l.updated_at))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let tombstone = self.tombstones.entry(id).or_insert(deleted_at);
        *tombstone = (*tombstone).max(deleted_at);
        removed.is_some()
    }

    /// Apply a stream event. Returns whether the view changed.
    pub fn apply(&mut self, event: LocationEvent) -> bool {
        match event.kind {
            LocationEventKind::Create | LocationEventKind::Update => match event.location {
                Some(location) => self.upsert(location),
                None => false,
            },
            LocationEventKind::Delete => match event.target_id() {
                Some(id) => {
                    let deleted_at = event.location.as_ref().map(|l| l.updated_at);
                    self.delete(id, deleted_at)
                }
                None => false,
            },
        }
    }

    /// Records ordered by `updated_at` descending, ties broken by id descending
    pub fn snapshot(&self) -> Vec<LocationResponseDto> {
        let mut locations: Vec<LocationResponseDto> = self.records.values().cloned().collect();
        locations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        locations
    }
}
