//! K-nearest-neighbor search over geohash prefix scans.
//!
//! The search starts at a fine precision and scans the query cell plus its
//! neighbors. If that block holds fewer than `k` points the candidates are
//! discarded and the search retries one precision coarser, down to the
//! configured minimum, where whatever was found is returned.
//!
//! Results are exact within the scanned block. A nearer point just outside
//! the block is not found; the neighbor ring bounds that miss to points
//! farther than one cell from the query.

use super::{decode_row, scan_cell};
use crate::compute::spatial::cell::{encode, neighborhood};
use crate::compute::spatial::topk::{BoundedTopK, Offer};
use crate::compute::validation::{validate_k, validate_lon_lat};
use crate::config::Config;
use crate::error::Result;
use crate::spatial::distance_between;
use crate::storage::RangeStore;
use geo::Point;
use geoscan_types::point::QueryMatch;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::sync::Arc;

/// Caller-supplied distance between the query point and a candidate.
pub type DistanceFn = Arc<dyn Fn(&Point, &Point) -> f64 + Send + Sync>;

/// Ring-expanding KNN search engine.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use geoscan::prelude::*;
///
/// let store = Arc::new(MemoryStore::new());
/// let index = GeoIndexBuilder::new().build_with_store(store.clone())?;
/// index.insert(&PointRecord::new("a", 0.001, 0.001))?;
/// index.insert(&PointRecord::new("b", 0.002, 0.002))?;
///
/// let engine = KnnSearchEngine::new(store, Config::default());
/// let nearest = engine.search(0.0, 0.0, 1)?;
/// assert_eq!(nearest[0].id, "a");
/// # Ok::<(), geoscan::GeoscanError>(())
/// ```
pub struct KnnSearchEngine<S: RangeStore + ?Sized> {
    store: Arc<S>,
    config: Config,
    distance: Option<DistanceFn>,
}

impl<S: RangeStore + ?Sized> KnnSearchEngine<S> {
    pub fn new(store: Arc<S>, config: Config) -> Self {
        Self {
            store,
            config,
            distance: None,
        }
    }

    /// Rank candidates with `distance` instead of the configured metric.
    pub fn with_distance_fn<F>(mut self, distance: F) -> Self
    where
        F: Fn(&Point, &Point) -> f64 + Send + Sync + 'static,
    {
        self.distance = Some(Arc::new(distance));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Find up to `k` stored points nearest to `(lon, lat)`, nearest first.
    ///
    /// Each returned match carries its distance. Fewer than `k` matches are
    /// returned only when the coarsest configured precision still did not
    /// yield `k` points.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when `k` is zero, `InvalidCoordinate` for an
    /// out-of-range query point, and any error raised by the store.
    pub fn search(&self, lon: f64, lat: f64, k: usize) -> Result<Vec<QueryMatch>> {
        validate_k(k)?;
        validate_lon_lat(lon, lat)?;

        let query = Point::new(lon, lat);
        let start = self.config.knn_start_precision;
        let min = self.config.knn_min_precision.min(start);

        let mut top = BoundedTopK::new(k);
        for precision in (min..=start).rev() {
            top = self.collect_at(&query, precision, k)?;
            if top.is_full() {
                log::debug!("Found {} neighbors at precision {}.", k, precision);
                break;
            }
            log::debug!(
                "Only {} of {} neighbors at precision {}.",
                top.len(),
                k,
                precision
            );
        }

        Ok(top
            .drain()
            .into_iter()
            .map(|(candidate, distance)| candidate.with_distance(distance))
            .collect())
    }

    fn collect_at(
        &self,
        query: &Point,
        precision: usize,
        k: usize,
    ) -> Result<BoundedTopK<QueryMatch>> {
        let center = encode(query.x(), query.y(), precision)?;
        let cells = neighborhood(&center)?;

        let mut top = BoundedTopK::new(k);
        let mut held: FxHashMap<String, f64> = FxHashMap::default();

        for cell in &cells {
            scan_cell(&*self.store, &self.config, cell, None, |row| {
                let Some(candidate) = decode_row(&row) else {
                    log::debug!(
                        "Skipping malformed row {}.",
                        String::from_utf8_lossy(&row.key)
                    );
                    return;
                };
                let distance = self.distance(query, &candidate.point());
                offer_unique(&mut top, &mut held, candidate, distance);
            })?;
        }

        Ok(top)
    }

    fn distance(&self, query: &Point, candidate: &Point) -> f64 {
        match &self.distance {
            Some(distance) => distance(query, candidate),
            None => distance_between(query, candidate, self.config.distance_metric),
        }
    }
}

/// Offer a candidate while keeping at most one entry per id, the nearest.
fn offer_unique(
    top: &mut BoundedTopK<QueryMatch>,
    held: &mut FxHashMap<String, f64>,
    candidate: QueryMatch,
    distance: f64,
) {
    if let Some(&current) = held.get(&candidate.id) {
        if distance.total_cmp(&current) != Ordering::Less {
            return;
        }
        top.remove_first(|m| m.id == candidate.id);
        held.remove(&candidate.id);
    }

    let id = candidate.id.clone();
    match top.offer(candidate, distance) {
        Offer::Inserted => {
            held.insert(id, distance);
        }
        Offer::Evicted(evicted) => {
            held.remove(&evicted.id);
            held.insert(id, distance);
        }
        Offer::Rejected(_) => {}
    }
}
