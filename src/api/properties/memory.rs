//! In-memory properties service, used offline and in tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{DraftCreated, DraftPayload, DraftUpdated, PropertiesService, PropertyRecord};
use crate::api::error::ServiceError;
use crate::wizard::DRAFT_ETAT;

#[derive(Default)]
struct Inner {
    records: HashMap<String, PropertyRecord>,
    update_delays: VecDeque<Duration>,
    create_delay: Option<Duration>,
    failing: Option<ServiceError>,
    create_calls: usize,
    update_calls: usize,
}

/// Properties service keeping records in process memory
#[derive(Default)]
pub struct InMemoryPropertiesService {
    inner: Mutex<Inner>,
}

impl InMemoryPropertiesService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not poison the other assertions
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace a record
    pub fn insert(&self, record: PropertyRecord) {
        self.lock().records.insert(record.id.clone(), record);
    }

    /// Current copy of a record
    pub fn record(&self, id: &str) -> Option<PropertyRecord> {
        self.lock().records.get(id).cloned()
    }

    /// Make every call fail with `error` until cleared with `None`
    pub fn set_failure(&self, error: Option<ServiceError>) {
        self.lock().failing = error;
    }

    /// Delay applied to the next update call (queued, one per call)
    pub fn push_update_delay(&self, delay: Duration) {
        self.lock().update_delays.push_back(delay);
    }

    /// Delay applied to every create call until cleared with `None`
    pub fn set_create_delay(&self, delay: Option<Duration>) {
        self.lock().create_delay = delay;
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn update_calls(&self) -> usize {
        self.lock().update_calls
    }

    fn check_failure(&self) -> Result<(), ServiceError> {
        match &self.lock().failing {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PropertiesService for InMemoryPropertiesService {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_draft(&self) -> Result<DraftCreated, ServiceError> {
        let delay = self.lock().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure()?;

        let id = Uuid::new_v4().to_string();
        let mut inner = self.lock();
        inner.create_calls += 1;
        inner.records.insert(
            id.clone(),
            PropertyRecord {
                id: id.clone(),
                etat: DRAFT_ETAT.to_string(),
                building_id: None,
                rooms: Vec::new(),
                photos: Vec::new(),
                fields: serde_json::Map::new(),
            },
        );
        debug!(id = %id, "Created in-memory draft");

        Ok(DraftCreated {
            id,
            etat: DRAFT_ETAT.to_string(),
            building_id: None,
        })
    }

    async fn update(&self, id: &str, payload: &DraftPayload) -> Result<DraftUpdated, ServiceError> {
        let delay = {
            let mut inner = self.lock();
            inner.update_calls += 1;
            inner.update_delays.pop_front()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure()?;

        let mut inner = self.lock();
        let record = inner
            .records
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;

        for (key, value) in &payload.fields {
            record.fields.insert(key.clone(), value.clone());
        }
        if payload.building_id.is_some() {
            record.building_id = payload.building_id.clone();
        }
        record.rooms = payload.rooms.clone();
        record.photos = payload.photos.clone();

        Ok(DraftUpdated { id: id.to_string() })
    }

    async fn get_by_id(&self, id: &str) -> Result<PropertyRecord, ServiceError> {
        self.check_failure()?;
        self.record(id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }
}
