//! Range-store abstraction for geoscan
//!
//! Rows live in a sorted key-value store keyed by geohash, so a prefix scan
//! returns every point inside a geohash cell. This module defines the store
//! contract the query engines depend on and ships an in-memory implementation.

mod memory;

pub use memory::MemoryStore;

use crate::compute::spatial::cell::GeohashCell;
use crate::error::Result;
use bytes::Bytes;
use geoscan_types::point::PointRecord;
use std::collections::BTreeMap;

/// Column holding the longitude as decimal text.
pub const LON_COLUMN: &[u8] = b"lon";
/// Column holding the latitude as decimal text.
pub const LAT_COLUMN: &[u8] = b"lat";
/// Column holding the opaque record identifier.
pub const ID_COLUMN: &[u8] = b"id";

/// Column family used when none is configured.
pub const DEFAULT_FAMILY: &str = "a";

/// Parse a coordinate column: trimmed decimal UTF-8 text, finite values only.
pub fn parse_coordinate(value: &[u8]) -> Option<f64> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|text| text.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// A stored row: its key and the columns of one family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub key: Bytes,
    pub columns: BTreeMap<Bytes, Bytes>,
}

impl Row {
    pub fn new(key: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Add a column, replacing any previous value under the same name.
    pub fn with_column(mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    pub fn column(&self, name: &[u8]) -> Option<&Bytes> {
        self.columns.get(name)
    }

    /// A row with no columns carries no point.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build the point row for `record` stored under `cell`.
    pub fn for_record(cell: &GeohashCell, record: &PointRecord) -> Self {
        Self::point(
            cell,
            record.lon.to_string(),
            record.lat.to_string(),
            record.id.clone(),
        )
    }

    /// Build a point row from already-formatted column text.
    pub fn point(
        cell: &GeohashCell,
        lon: impl Into<Bytes>,
        lat: impl Into<Bytes>,
        id: impl Into<Bytes>,
    ) -> Self {
        Self::new(Bytes::copy_from_slice(cell.code().as_bytes()))
            .with_column(LON_COLUMN, lon)
            .with_column(LAT_COLUMN, lat)
            .with_column(ID_COLUMN, id)
    }
}

/// A prefix scan over one column family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Only rows whose key starts with these bytes are returned.
    pub prefix: Bytes,
    pub family: String,
    /// Number of versions per cell; queries read only the latest.
    pub max_versions: u32,
    /// Serialized row predicate evaluated by the store for every row.
    pub row_filter: Option<Bytes>,
    /// Rows the store may fetch per round trip.
    pub cache_hint: usize,
}

impl ScanRequest {
    pub fn prefix(prefix: impl AsRef<[u8]>, family: impl Into<String>) -> Self {
        Self {
            prefix: Bytes::copy_from_slice(prefix.as_ref()),
            family: family.into(),
            max_versions: 1,
            row_filter: None,
            cache_hint: 50,
        }
    }

    pub fn with_row_filter(mut self, filter: Bytes) -> Self {
        self.row_filter = Some(filter);
        self
    }

    pub fn with_cache_hint(mut self, cache_hint: usize) -> Self {
        self.cache_hint = cache_hint;
        self
    }

    pub fn with_max_versions(mut self, max_versions: u32) -> Self {
        self.max_versions = max_versions;
        self
    }
}

/// Rows produced by a scan, in key order.
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<Row>> + Send + 'a>;

/// Trait for sorted, prefix-scannable row stores
///
/// Implementations must return rows in ascending key order and must apply
/// `ScanRequest::row_filter`, when present, to every row before yielding it.
pub trait RangeStore: Send + Sync {
    /// Scan every row whose key starts with `request.prefix`.
    fn scan(&self, request: &ScanRequest) -> Result<RowIter<'_>>;

    /// Insert or replace a row in `family`
    fn put(&self, family: &str, row: Row) -> Result<()>;

    /// Delete a row and return it if it existed
    fn delete(&self, family: &str, key: &[u8]) -> Result<Option<Row>>;

    /// Apply a group of writes in order
    fn batch(&self, ops: Vec<StorageOp>) -> Result<()> {
        for op in ops {
            match op {
                StorageOp::Put { family, row } => self.put(&family, row)?,
                StorageOp::Delete { family, key } => {
                    self.delete(&family, &key)?;
                }
            }
        }
        Ok(())
    }

    /// Total number of rows across all families
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn stats(&self) -> Result<StorageStats>;

    /// Release the store; later requests fail with `StoreUnavailable`.
    fn close(&self) -> Result<()>;
}

/// Storage operation for batch processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Put { family: String, row: Row },
    Delete { family: String, key: Bytes },
}

/// Store statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Rows currently stored
    pub row_count: usize,
    /// Scans served
    pub scans: u64,
    /// Rows visited by scans, before any row filter
    pub rows_scanned: u64,
    /// Rows discarded by a pushed-down row filter
    pub rows_filtered: u64,
    /// Writes and deletes applied
    pub operations_count: u64,
}
