//! Geohash-keyed point index with KNN and polygon search over sorted range stores.
//!
//! Points are stored under their geohash, so spatial neighborhoods are key
//! ranges. Queries become a handful of prefix scans followed by exact
//! ranking or containment tests, which can run locally or be pushed down to
//! the store as a serialized row filter.
//!
//! ```rust
//! use geoscan::prelude::*;
//!
//! let index = GeoIndex::memory()?;
//! index.insert(&PointRecord::new("a", 0.001, 0.001))?;
//! index.insert(&PointRecord::new("b", 0.002, 0.002))?;
//!
//! let nearest = index.knn(0.0, 0.0, 1)?;
//! assert_eq!(nearest[0].id, "a");
//!
//! let square = "POLYGON((-0.5 -0.5, 0.5 -0.5, 0.5 0.5, -0.5 0.5, -0.5 -0.5))";
//! let local = index.within_wkt(square, QueryMode::Local)?;
//! let pushed = index.within_wkt(square, QueryMode::Pushdown)?;
//! assert_eq!(local.ids(), pushed.ids());
//! # Ok::<(), geoscan::GeoscanError>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod query;
pub mod spatial;
pub mod storage;

pub use builder::GeoIndexBuilder;
pub use config::Config;
pub use db::{GeoIndex, QueryOutput};
pub use error::{GeoscanError, Result};

pub use geo::{Geometry, Point, Polygon, Rect};

pub use compute::spatial::{BoundedTopK, GeohashCell};
pub use filter::{Decision, WithinFilter};
pub use ingest::IngestReport;
pub use query::{KnnSearchEngine, RegionResult, RegionSearchEngine, minimum_bounding_prefixes};
pub use spatial::{DistanceMetric, distance_between};
pub use storage::{MemoryStore, RangeStore, Row, ScanRequest, StorageOp, StorageStats};

pub use geoscan_types::point::{PointRecord, QueryMatch};
pub use geoscan_types::query::{QueryMode, SpatialQuery};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{GeoIndex, GeoIndexBuilder, GeoscanError, Result};

    pub use geo::{Geometry, Point, Polygon};

    pub use crate::{PointRecord, QueryMatch, QueryMode, SpatialQuery};

    pub use crate::{Config, DistanceMetric};

    pub use crate::{KnnSearchEngine, RegionResult, RegionSearchEngine};

    pub use crate::{MemoryStore, RangeStore};
}
