//! In-memory range store.
//!
//! Families map to `BTreeMap`s keyed by row key, so prefix scans are range
//! scans. The store doubles as a scan-pipeline host: a serialized
//! [`WithinFilter`] attached to a request is decoded once per scan and applied
//! to every row before it is returned.

use super::{RangeStore, Row, RowIter, ScanRequest, StorageOp, StorageStats};
use crate::error::{GeoscanError, Result};
use crate::filter::{Decision, WithinFilter};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

type Family = BTreeMap<Bytes, BTreeMap<Bytes, Bytes>>;

#[derive(Default)]
struct Inner {
    families: BTreeMap<String, Family>,
    stats: StorageStats,
    closed: bool,
}

impl Inner {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(GeoscanError::StoreUnavailable(
                "store has been closed".to_string(),
            ));
        }
        Ok(())
    }

    fn put(&mut self, family: &str, row: Row) {
        self.families
            .entry(family.to_string())
            .or_default()
            .insert(row.key, row.columns);
        self.stats.operations_count += 1;
    }

    fn delete(&mut self, family: &str, key: &[u8]) -> Option<Row> {
        self.stats.operations_count += 1;
        let rows = self.families.get_mut(family)?;
        rows.remove_entry(key).map(|(key, columns)| Row { key, columns })
    }

    fn row_count(&self) -> usize {
        self.families.values().map(BTreeMap::len).sum()
    }
}

/// In-memory store keeping the latest version of every row
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a single row by key.
    pub fn get(&self, family: &str, key: &[u8]) -> Result<Option<Row>> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(inner.families.get(family).and_then(|rows| {
            rows.get_key_value(key).map(|(key, columns)| Row {
                key: key.clone(),
                columns: columns.clone(),
            })
        }))
    }
}

impl RangeStore for MemoryStore {
    fn scan(&self, request: &ScanRequest) -> Result<RowIter<'_>> {
        if request.max_versions == 0 {
            return Err(GeoscanError::InvalidInput(
                "max_versions must be at least 1".to_string(),
            ));
        }

        let mut filter = request
            .row_filter
            .as_deref()
            .map(WithinFilter::deserialize)
            .transpose()?;

        let mut inner = self.inner.write();
        inner.ensure_open()?;

        let prefix = &request.prefix[..];
        let mut rows = Vec::new();
        let mut scanned = 0u64;
        let mut filtered = 0u64;

        if let Some(family) = inner.families.get(&request.family) {
            let range = family
                .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
                .take_while(|(key, _)| key.starts_with(prefix));

            for (key, columns) in range {
                scanned += 1;
                let row = Row {
                    key: key.clone(),
                    columns: columns.clone(),
                };
                if let Some(filter) = filter.as_mut()
                    && filter.filter_row(&row) == Decision::Exclude
                {
                    filtered += 1;
                    continue;
                }
                rows.push(row);
            }
        }

        inner.stats.scans += 1;
        inner.stats.rows_scanned += scanned;
        inner.stats.rows_filtered += filtered;

        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn put(&self, family: &str, row: Row) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        inner.put(family, row);
        Ok(())
    }

    fn delete(&self, family: &str, key: &[u8]) -> Result<Option<Row>> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        Ok(inner.delete(family, key))
    }

    fn batch(&self, ops: Vec<StorageOp>) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        for op in ops {
            match op {
                StorageOp::Put { family, row } => inner.put(&family, row),
                StorageOp::Delete { family, key } => {
                    inner.delete(&family, &key);
                }
            }
        }
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(inner.row_count())
    }

    fn stats(&self) -> Result<StorageStats> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        let mut stats = inner.stats;
        stats.row_count = inner.row_count();
        Ok(stats)
    }

    fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.families.clear();
        inner.stats = StorageStats::default();
        inner.closed = true;
        Ok(())
    }
}
