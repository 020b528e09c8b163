//! Query and ingestion configuration
//!
//! Every field has a serde default, so a config file only needs to name the
//! values it changes.

use crate::compute::spatial::cell::{MAX_PRECISION, MIN_PRECISION};
use crate::error::{GeoscanError, Result};
use crate::spatial::DistanceMetric;
use crate::storage::DEFAULT_FAMILY;
use serde::{Deserialize, Serialize};

/// Configuration shared by the query engines, the ingester and the store
/// requests they issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Column family holding the point columns.
    #[serde(default = "Config::default_column_family")]
    pub column_family: String,

    /// Geohash precision of stored row keys (1-12, default: 12)
    #[serde(default = "Config::default_ingest_precision")]
    pub ingest_precision: usize,

    /// Finest precision tried by KNN queries (default: 7)
    #[serde(default = "Config::default_knn_start_precision")]
    pub knn_start_precision: usize,

    /// Coarsest precision tried by KNN queries before giving up on a full
    /// result (default: 2)
    #[serde(default = "Config::default_knn_min_precision")]
    pub knn_min_precision: usize,

    /// Finest precision tried when bounding a region query (default: 7)
    #[serde(default = "Config::default_region_max_precision")]
    pub region_max_precision: usize,

    /// Rows fetched per store round trip during scans.
    #[serde(default = "Config::default_scan_cache_hint")]
    pub scan_cache_hint: usize,

    #[serde(default = "Config::default_max_versions")]
    pub max_versions: u32,

    /// Rows written per store batch during ingestion.
    #[serde(default = "Config::default_ingest_batch_size")]
    pub ingest_batch_size: usize,

    /// Metric used to rank KNN candidates.
    #[serde(default)]
    pub distance_metric: DistanceMetric,
}

impl Config {
    fn default_column_family() -> String {
        DEFAULT_FAMILY.to_string()
    }

    const fn default_ingest_precision() -> usize {
        12
    }

    const fn default_knn_start_precision() -> usize {
        7
    }

    const fn default_knn_min_precision() -> usize {
        2
    }

    const fn default_region_max_precision() -> usize {
        7
    }

    const fn default_scan_cache_hint() -> usize {
        50
    }

    const fn default_max_versions() -> u32 {
        1
    }

    const fn default_ingest_batch_size() -> usize {
        1000
    }

    pub fn with_column_family(mut self, family: impl Into<String>) -> Self {
        self.column_family = family.into();
        self
    }

    pub fn with_ingest_precision(mut self, precision: usize) -> Self {
        self.ingest_precision = precision;
        self
    }

    /// Set the precision range walked by KNN queries, finest first.
    pub fn with_knn_precisions(mut self, start: usize, min: usize) -> Self {
        self.knn_start_precision = start;
        self.knn_min_precision = min;
        self
    }

    pub fn with_region_max_precision(mut self, precision: usize) -> Self {
        self.region_max_precision = precision;
        self
    }

    pub fn with_scan_cache_hint(mut self, cache_hint: usize) -> Self {
        self.scan_cache_hint = cache_hint;
        self
    }

    pub fn with_ingest_batch_size(mut self, batch_size: usize) -> Self {
        self.ingest_batch_size = batch_size;
        self
    }

    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let precisions = [
            ("ingest_precision", self.ingest_precision),
            ("knn_start_precision", self.knn_start_precision),
            ("knn_min_precision", self.knn_min_precision),
            ("region_max_precision", self.region_max_precision),
        ];
        for (name, precision) in precisions {
            if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
                return Err(GeoscanError::Config(format!(
                    "{name} must be between {MIN_PRECISION} and {MAX_PRECISION}, got {precision}"
                )));
            }
        }

        if self.knn_min_precision > self.knn_start_precision {
            return Err(GeoscanError::Config(format!(
                "knn_min_precision ({}) must not exceed knn_start_precision ({})",
                self.knn_min_precision, self.knn_start_precision
            )));
        }

        if self.column_family.is_empty() {
            return Err(GeoscanError::Config(
                "column_family must not be empty".to_string(),
            ));
        }

        if self.scan_cache_hint == 0 {
            return Err(GeoscanError::Config(
                "scan_cache_hint must be greater than zero".to_string(),
            ));
        }

        if self.max_versions == 0 {
            return Err(GeoscanError::Config(
                "max_versions must be greater than zero".to_string(),
            ));
        }

        if self.ingest_batch_size == 0 {
            return Err(GeoscanError::Config(
                "ingest_batch_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| GeoscanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GeoscanError::Config(e.to_string()))
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(toml_str).map_err(|e| GeoscanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GeoscanError::Config(e.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            column_family: Self::default_column_family(),
            ingest_precision: Self::default_ingest_precision(),
            knn_start_precision: Self::default_knn_start_precision(),
            knn_min_precision: Self::default_knn_min_precision(),
            region_max_precision: Self::default_region_max_precision(),
            scan_cache_hint: Self::default_scan_cache_hint(),
            max_versions: Self::default_max_versions(),
            ingest_batch_size: Self::default_ingest_batch_size(),
            distance_metric: DistanceMetric::default(),
        }
    }
}
