//! The `GeoIndex` facade.
//!
//! `GeoIndex` bundles a range store, a configuration and the two query
//! engines behind one handle. It is cheap to clone; clones share the store.

use crate::builder::GeoIndexBuilder;
use crate::compute::spatial::cell::{GeohashCell, encode};
use crate::config::Config;
use crate::error::Result;
use crate::ingest::{IngestReport, ingest_delimited, ingest_file};
use crate::query::{KnnSearchEngine, RegionResult, RegionSearchEngine};
use crate::spatial::parse_wkt;
use crate::storage::{MemoryStore, RangeStore, Row, StorageOp, StorageStats};
use geo::Geometry;
use geoscan_types::point::{PointRecord, QueryMatch};
use geoscan_types::query::{QueryMode, SpatialQuery};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

/// Answer to a [`SpatialQuery`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// KNN matches, nearest first.
    Neighbors(Vec<QueryMatch>),
    Region(RegionResult),
}

impl QueryOutput {
    /// The matches, regardless of query kind.
    pub fn matches(&self) -> &[QueryMatch] {
        match self {
            QueryOutput::Neighbors(matches) => matches,
            QueryOutput::Region(result) => &result.matches,
        }
    }
}

/// Geohash-keyed point index over a range store.
///
/// # Examples
///
/// ```rust
/// use geoscan::prelude::*;
///
/// let index = GeoIndex::memory()?;
/// index.insert(&PointRecord::new("a", 0.001, 0.001))?;
/// index.insert(&PointRecord::new("b", 0.002, 0.002))?;
/// index.insert(&PointRecord::new("c", 50.0, 50.0))?;
///
/// let nearest = index.knn(0.0, 0.0, 2)?;
/// assert_eq!(nearest.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);
///
/// let square = "POLYGON((-0.5 -0.5, 0.5 -0.5, 0.5 0.5, -0.5 0.5, -0.5 -0.5))";
/// let inside = index.within_wkt(square, QueryMode::Pushdown)?;
/// assert_eq!(inside.ids(), ["a", "b"]);
/// # Ok::<(), geoscan::GeoscanError>(())
/// ```
pub struct GeoIndex<S: RangeStore + ?Sized = MemoryStore> {
    store: Arc<S>,
    config: Config,
}

impl<S: RangeStore + ?Sized> Clone for GeoIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl GeoIndex<MemoryStore> {
    /// Open an index over a fresh in-memory store with default configuration.
    pub fn memory() -> Result<Self> {
        GeoIndexBuilder::new().build()
    }

    /// Create a builder for custom configuration.
    pub fn builder() -> GeoIndexBuilder {
        GeoIndexBuilder::new()
    }
}

impl<S: RangeStore + ?Sized> GeoIndex<S> {
    pub(crate) fn from_parts(store: Arc<S>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn knn_engine(&self) -> KnnSearchEngine<S> {
        KnnSearchEngine::new(Arc::clone(&self.store), self.config.clone())
    }

    pub fn region_engine(&self) -> RegionSearchEngine<S> {
        RegionSearchEngine::new(Arc::clone(&self.store), self.config.clone())
    }

    /// Store one record and return the cell it is keyed under.
    pub fn insert(&self, record: &PointRecord) -> Result<GeohashCell> {
        let cell = encode(record.lon, record.lat, self.config.ingest_precision)?;
        self.store
            .put(&self.config.column_family, Row::for_record(&cell, record))?;
        Ok(cell)
    }

    /// Store many records in one store batch.
    ///
    /// Every record is validated before anything is written.
    pub fn insert_batch(&self, records: &[PointRecord]) -> Result<usize> {
        let ops = records
            .iter()
            .map(|record| -> Result<StorageOp> {
                let cell = encode(record.lon, record.lat, self.config.ingest_precision)?;
                Ok(StorageOp::Put {
                    family: self.config.column_family.clone(),
                    row: Row::for_record(&cell, record),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let count = ops.len();
        self.store.batch(ops)?;
        Ok(count)
    }

    /// Load delimited `lon,lat,id` text with a header line.
    pub fn ingest<R: BufRead>(&self, reader: R) -> Result<IngestReport> {
        ingest_delimited(reader, &*self.store, &self.config)
    }

    /// Load a delimited `lon,lat,id` file with a header line.
    pub fn ingest_file<P: AsRef<Path>>(&self, path: P) -> Result<IngestReport> {
        ingest_file(path, &*self.store, &self.config)
    }

    /// The `k` stored points nearest to `(lon, lat)`, nearest first.
    pub fn knn(&self, lon: f64, lat: f64, k: usize) -> Result<Vec<QueryMatch>> {
        self.knn_engine().search(lon, lat, k)
    }

    /// Every stored point inside `geometry`.
    pub fn within(&self, geometry: &Geometry, mode: QueryMode) -> Result<RegionResult> {
        self.region_engine().search(geometry, mode)
    }

    /// Every stored point inside the geometry described by `wkt`.
    pub fn within_wkt(&self, wkt: &str, mode: QueryMode) -> Result<RegionResult> {
        let geometry = parse_wkt(wkt)?;
        self.within(&geometry, mode)
    }

    /// Run a query. `mode` applies to region queries only.
    pub fn query(&self, query: &SpatialQuery, mode: QueryMode) -> Result<QueryOutput> {
        match query {
            SpatialQuery::Knn { lon, lat, k } => {
                self.knn(*lon, *lat, *k).map(QueryOutput::Neighbors)
            }
            SpatialQuery::Region { polygon } => {
                self.within(polygon, mode).map(QueryOutput::Region)
            }
        }
    }

    pub fn len(&self) -> Result<usize> {
        self.store.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.store.is_empty()
    }

    pub fn stats(&self) -> Result<StorageStats> {
        self.store.stats()
    }

    /// Close the underlying store.
    pub fn close(&self) -> Result<()> {
        self.store.close()
    }
}
