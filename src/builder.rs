//! Builder for `GeoIndex` configuration
//!
//! Collects a [`Config`] and opens an index over either a fresh in-memory
//! store or a caller-provided range store.

use crate::config::Config;
use crate::db::GeoIndex;
use crate::error::Result;
use crate::spatial::DistanceMetric;
use crate::storage::{MemoryStore, RangeStore};
use std::path::Path;
use std::sync::Arc;

/// Builder for index configuration.
#[derive(Debug, Clone, Default)]
pub struct GeoIndexBuilder {
    config: Config,
}

impl GeoIndexBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a JSON file.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        self.config = Config::from_json_str(&text)?;
        Ok(self)
    }

    pub fn column_family(mut self, family: impl Into<String>) -> Self {
        self.config = self.config.with_column_family(family);
        self
    }

    pub fn ingest_precision(mut self, precision: usize) -> Self {
        self.config = self.config.with_ingest_precision(precision);
        self
    }

    pub fn distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.config = self.config.with_distance_metric(metric);
        self
    }

    /// Validate the configuration and open an index over a new in-memory store.
    pub fn build(self) -> Result<GeoIndex<MemoryStore>> {
        self.build_with_store(Arc::new(MemoryStore::new()))
    }

    /// Validate the configuration and open an index over `store`.
    pub fn build_with_store<S: RangeStore + ?Sized>(self, store: Arc<S>) -> Result<GeoIndex<S>> {
        self.config.validate()?;
        Ok(GeoIndex::from_parts(store, self.config))
    }
}
