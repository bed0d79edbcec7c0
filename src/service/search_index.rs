//! Search-term extraction from JSON list payloads

use log::{debug, warn};
use serde_json::Value;

use crate::config::LifecycleConfig;
use crate::metadata::SearchIndex;

/// Collects values under configured field names anywhere in a JSON payload
#[derive(Debug, Clone)]
pub struct SearchIndexer {
    fields: Vec<String>,
    max_values_per_field: usize,
    payload_limit: u64,
}

impl SearchIndexer {
    pub fn new(fields: Vec<String>, max_values_per_field: usize, payload_limit: u64) -> Self {
        Self {
            fields,
            max_values_per_field,
            payload_limit,
        }
    }

    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self::new(
            config.search_fields.clone(),
            config.max_search_values_per_field,
            config.search_index_payload_limit,
        )
    }

    /// Build the index for a payload. Flat files, oversized payloads and
    /// payloads that are not valid JSON produce an empty index.
    pub fn derive(&self, payload: &[u8], is_flat_file: bool) -> SearchIndex {
        let mut index = SearchIndex::new();
        if is_flat_file {
            return index;
        }
        if payload.len() as u64 > self.payload_limit {
            debug!(
                "Payload of {} bytes exceeds search index limit {}, skipping",
                payload.len(),
                self.payload_limit
            );
            return index;
        }
        match serde_json::from_slice::<Value>(payload) {
            Ok(json) => self.collect(&json, &mut index),
            Err(e) => warn!("Payload is not valid JSON, search index left empty: {}", e),
        }
        index
    }

    fn collect(&self, value: &Value, index: &mut SearchIndex) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if self.fields.iter().any(|f| f == key) {
                        self.record(key, child, index);
                    }
                    self.collect(child, index);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.collect(item, index);
                }
            }
            _ => {}
        }
    }

    fn record(&self, field: &str, value: &Value, index: &mut SearchIndex) {
        match value {
            Value::String(s) if !s.trim().is_empty() => self.push(field, s.trim().to_string(), index),
            Value::Number(n) => self.push(field, n.to_string(), index),
            Value::Array(items) => {
                for item in items {
                    if !item.is_object() && !item.is_array() {
                        self.record(field, item, index);
                    }
                }
            }
            _ => {}
        }
    }

    fn push(&self, field: &str, value: String, index: &mut SearchIndex) {
        let values = index.entry(field.to_string()).or_default();
        if values.len() < self.max_values_per_field && !values.contains(&value) {
            values.push(value);
        }
    }
}
