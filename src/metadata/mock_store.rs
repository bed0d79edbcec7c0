//! Mock implementation of MetadataStorage trait for testing

use crate::call_trace::CallTrace;
use crate::error::StoreError;
use crate::metadata::{
    search_index_matches, Artefact, ArtefactId, LocationId, MetadataStorage, NaturalKey,
};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Rows {
    next_id: i64,
    rows: BTreeMap<ArtefactId, Artefact>,
}

impl Rows {
    fn live(&self) -> impl Iterator<Item = &Artefact> {
        self.rows.values().filter(|a| !a.archived)
    }

    fn live_with_key(&self, key: &NaturalKey) -> Option<&Artefact> {
        self.live().find(|a| &a.natural_key() == key)
    }
}

/// Mock implementation of MetadataStorage for testing
///
/// Enforces live natural-key uniqueness like the SQLite schema, and can be
/// told to fail upcoming `save` calls to simulate contention.
pub struct MockMetadataStore {
    data: Arc<Mutex<Rows>>,
    save_failures: Mutex<VecDeque<StoreError>>,
    trace: CallTrace,
}

impl MockMetadataStore {
    /// Create a new mock metadata store
    pub fn new() -> Self {
        Self::with_trace(CallTrace::new())
    }

    /// Create a store that records `metadata.*` calls into `trace`
    pub fn with_trace(trace: CallTrace) -> Self {
        Self {
            data: Arc::new(Mutex::new(Rows {
                next_id: 1,
                rows: BTreeMap::new(),
            })),
            save_failures: Mutex::new(VecDeque::new()),
            trace,
        }
    }

    /// Fail the next `count` save calls with `error`, in addition to any already queued
    pub fn fail_next_saves(&self, count: usize, error: StoreError) {
        let mut failures = self.save_failures.lock().unwrap();
        failures.extend(std::iter::repeat(error).take(count));
    }

    pub fn pending_save_failures(&self) -> usize {
        self.save_failures.lock().unwrap().len()
    }

    /// Every row, archived ones included
    pub fn all_rows(&self) -> Vec<Artefact> {
        self.data.lock().unwrap().rows.values().cloned().collect()
    }

    /// Number of live rows
    pub fn live_count(&self) -> usize {
        self.data.lock().unwrap().live().count()
    }

    /// Clear all data from the store (useful for test cleanup)
    pub fn clear(&self) {
        self.data.lock().unwrap().rows.clear();
        self.save_failures.lock().unwrap().clear();
    }
}

impl Default for MockMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStorage for MockMetadataStore {
    fn find_by_natural_key(&self, key: &NaturalKey) -> Result<Option<Artefact>, StoreError> {
        Ok(self.data.lock().unwrap().live_with_key(key).cloned())
    }

    fn find_by_id(&self, id: ArtefactId) -> Result<Option<Artefact>, StoreError> {
        let data = self.data.lock().unwrap();
        Ok(data.rows.get(&id).filter(|a| !a.archived).cloned())
    }

    fn save(&self, artefact: &Artefact) -> Result<Artefact, StoreError> {
        if let Some(error) = self.save_failures.lock().unwrap().pop_front() {
            self.trace.record("metadata.save:failed");
            return Err(error);
        }

        let mut data = self.data.lock().unwrap();
        let key = artefact.natural_key();
        if let Some(existing) = data.live_with_key(&key) {
            if existing.id != artefact.id {
                self.trace.record("metadata.save:failed");
                return Err(StoreError::ConstraintViolation(format!(
                    "live artefact {:?} already holds this natural key",
                    existing.id
                )));
            }
        }

        let id = match artefact.id {
            Some(id) => {
                let read_count = artefact.superseded_count.checked_sub(1).ok_or_else(|| {
                    StoreError::Backend(format!("replacement for artefact {} has a zero superseded count", id))
                })?;
                if let Some(stored) = data.rows.get(&id) {
                    if stored.archived || stored.superseded_count != read_count {
                        self.trace.record("metadata.save:failed");
                        return Err(StoreError::ConstraintViolation(format!(
                            "artefact {} changed since it was read",
                            id
                        )));
                    }
                }
                id
            }
            None => {
                let id = ArtefactId(data.next_id);
                data.next_id += 1;
                id
            }
        };
        let mut saved = artefact.clone();
        saved.id = Some(id);
        saved.archived = false;
        data.rows.insert(id, saved.clone());
        self.trace.record(format!("metadata.save:{}", id));
        Ok(saved)
    }

    fn delete(&self, artefact: &Artefact) -> Result<(), StoreError> {
        let id = artefact
            .id
            .ok_or_else(|| StoreError::NotFound("artefact has no id".to_string()))?;
        self.trace.record(format!("metadata.delete:{}", id));
        match self.data.lock().unwrap().rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("No artefact row with id {}", id))),
        }
    }

    fn archive(&self, artefact: &Artefact) -> Result<bool, StoreError> {
        let id = artefact
            .id
            .ok_or_else(|| StoreError::NotFound("artefact has no id".to_string()))?;
        self.trace.record(format!("metadata.archive:{}", id));
        let mut data = self.data.lock().unwrap();
        match data
            .rows
            .get_mut(&id)
            .filter(|row| !row.archived && row.payload == artefact.payload)
        {
            Some(row) => {
                row.archived = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_expired(&self, now: NaiveDateTime) -> Result<Vec<Artefact>, StoreError> {
        let data = self.data.lock().unwrap();
        Ok(data
            .live()
            .filter(|a| a.display_to.map_or(false, |to| to < now))
            .cloned()
            .collect())
    }

    fn find_by_location(&self, location: &LocationId) -> Result<Vec<Artefact>, StoreError> {
        let data = self.data.lock().unwrap();
        Ok(data.live().filter(|a| &a.location_id == location).cloned().collect())
    }

    fn search(&self, term: &str, value: &str) -> Result<Vec<Artefact>, StoreError> {
        let data = self.data.lock().unwrap();
        Ok(data
            .live()
            .filter(|a| search_index_matches(a, term, value))
            .cloned()
            .collect())
    }
}
