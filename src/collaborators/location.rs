//! Location lookup backed by configured reference data

use std::collections::HashMap;

use log::debug;

use crate::collaborators::LocationResolver;
use crate::config::LocationEntry;

/// Resolves locations from a fixed `(provenance, provenance location id)` table
#[derive(Debug, Clone, Default)]
pub struct StaticLocationResolver {
    entries: HashMap<(String, String), String>,
}

impl StaticLocationResolver {
    pub fn new(entries: &[LocationEntry]) -> Self {
        let entries = entries
            .iter()
            .map(|e| {
                (
                    (e.provenance.to_uppercase(), e.provenance_location_id.clone()),
                    e.location_id.clone(),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LocationResolver for StaticLocationResolver {
    fn resolve(&self, provenance: &str, provenance_location_id: &str) -> Option<String> {
        let key = (provenance.to_uppercase(), provenance_location_id.trim().to_string());
        let resolved = self.entries.get(&key).cloned();
        if resolved.is_none() {
            debug!(
                "No location mapping for provenance {} id {}",
                provenance, provenance_location_id
            );
        }
        resolved
    }
}
