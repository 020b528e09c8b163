//! Region (polygon containment) search.
//!
//! A region query is answered in two steps. First a small set of geohash
//! prefixes is chosen whose cells cover the query geometry. Then every row
//! under those prefixes is tested for containment, either here
//! ([`QueryMode::Local`]) or by the store through a serialized
//! [`WithinFilter`] ([`QueryMode::Pushdown`]). Both modes use the same
//! boundary-inclusive test, so they return the same ids.

use super::{decode_row, scan_cell};
use crate::compute::spatial::cell::{GeohashCell, MIN_PRECISION, encode, neighborhood};
use crate::compute::validation::validate_precision;
use crate::config::Config;
use crate::error::{GeoscanError, Result};
use crate::filter::WithinFilter;
use crate::spatial::{cells_hull, contains, hull_contains, parse_wkt};
use crate::storage::RangeStore;
use geo::{Centroid, Geometry};
use geoscan_types::point::QueryMatch;
use geoscan_types::query::QueryMode;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Matches of a region query.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionResult {
    /// Contained points, one per id, sorted by id.
    pub matches: Vec<QueryMatch>,
    /// Prefixes that were scanned.
    pub prefixes: Vec<GeohashCell>,
    /// Rows scanned but rejected. Only known in local mode; in pushdown mode
    /// the store drops those rows before they reach the client.
    pub excluded: Option<usize>,
    pub mode: QueryMode,
}

impl RegionResult {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.id.as_str()).collect()
    }
}

/// Choose the prefixes to scan for `geometry`.
///
/// Walks from `max_precision` down to 1, anchored on the cell containing the
/// geometry's centroid. At each precision the cell alone is tried first, then
/// the cell with its neighbors; the first set whose corner hull contains the
/// geometry wins. The result is sorted and free of duplicates.
///
/// This is a heuristic: a geometry much larger than a precision-1 block, or
/// one whose centroid lies far from its bulk, cannot be bounded.
///
/// # Errors
///
/// `UnboundableQuery` when no precision works or the geometry is empty,
/// `InvalidPrecision` for a bad `max_precision`.
pub fn minimum_bounding_prefixes(
    geometry: &Geometry,
    max_precision: usize,
) -> Result<Vec<GeohashCell>> {
    validate_precision(max_precision)?;
    let centroid = geometry.centroid().ok_or(GeoscanError::UnboundableQuery)?;

    for precision in (MIN_PRECISION..=max_precision).rev() {
        let cell = encode(centroid.x(), centroid.y(), precision)?;
        if cells_hull(&cell, [&cell]).is_some_and(|hull| hull_contains(&hull, geometry)) {
            return Ok(vec![cell]);
        }

        let block = neighborhood(&cell)?;
        if cells_hull(&cell, block.iter()).is_some_and(|hull| hull_contains(&hull, geometry)) {
            return Ok(block.into_vec());
        }
    }

    Err(GeoscanError::UnboundableQuery)
}

/// Region search engine over a range store.
pub struct RegionSearchEngine<S: RangeStore + ?Sized> {
    store: Arc<S>,
    config: Config,
}

impl<S: RangeStore + ?Sized> RegionSearchEngine<S> {
    pub fn new(store: Arc<S>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Prefixes scanned for `geometry` under this engine's configuration.
    pub fn minimum_bounding_prefixes(&self, geometry: &Geometry) -> Result<Vec<GeohashCell>> {
        minimum_bounding_prefixes(geometry, self.config.region_max_precision)
    }

    /// Parse `wkt` and run [`search`](Self::search).
    pub fn search_wkt(&self, wkt: &str, mode: QueryMode) -> Result<RegionResult> {
        let geometry = parse_wkt(wkt)?;
        self.search(&geometry, mode)
    }

    /// Find every stored point inside `geometry`, boundary included.
    pub fn search(&self, geometry: &Geometry, mode: QueryMode) -> Result<RegionResult> {
        let prefixes = self.minimum_bounding_prefixes(geometry)?;
        log::debug!(
            "Bounding {} query with {} prefixes: {}",
            mode,
            prefixes.len(),
            prefixes
                .iter()
                .map(GeohashCell::code)
                .collect::<Vec<_>>()
                .join(",")
        );

        match mode {
            QueryMode::Local => self.search_local(geometry, prefixes),
            QueryMode::Pushdown => self.search_pushdown(geometry, prefixes),
        }
    }

    fn search_local(
        &self,
        geometry: &Geometry,
        prefixes: Vec<GeohashCell>,
    ) -> Result<RegionResult> {
        let mut matches = BTreeMap::new();
        let mut candidates = 0;
        let mut excluded = 0;

        for cell in &prefixes {
            candidates += scan_cell(&*self.store, &self.config, cell, None, |row| {
                match decode_row(&row) {
                    Some(candidate) if contains(geometry, candidate.lon, candidate.lat) => {
                        matches.entry(candidate.id.clone()).or_insert(candidate);
                    }
                    Some(_) => excluded += 1,
                    None => {
                        log::debug!("{} is not a point.", String::from_utf8_lossy(&row.key));
                        excluded += 1;
                    }
                }
            })?;
        }

        log::info!(
            "Filter excluded {} of {} candidates.",
            excluded,
            candidates
        );

        Ok(RegionResult {
            matches: matches.into_values().collect(),
            prefixes,
            excluded: Some(excluded),
            mode: QueryMode::Local,
        })
    }

    fn search_pushdown(
        &self,
        geometry: &Geometry,
        prefixes: Vec<GeohashCell>,
    ) -> Result<RegionResult> {
        let filter = WithinFilter::new(geometry.clone()).serialize();
        let mut matches = BTreeMap::new();

        for cell in &prefixes {
            scan_cell(&*self.store, &self.config, cell, Some(&filter), |row| {
                match decode_row(&row) {
                    Some(candidate) => {
                        matches.entry(candidate.id.clone()).or_insert(candidate);
                    }
                    None => {
                        log::debug!("{} is not a point.", String::from_utf8_lossy(&row.key));
                    }
                }
            })?;
        }

        Ok(RegionResult {
            matches: matches.into_values().collect(),
            prefixes,
            excluded: None,
            mode: QueryMode::Pushdown,
        })
    }
}
