//! Query engines over a range store.
//!
//! Both engines translate a spatial question into geohash prefix scans and
//! finish the work client side: KNN ranks candidates by distance, region
//! search keeps the candidates inside the query geometry (or lets the store do
//! it with a pushed-down [`WithinFilter`](crate::filter::WithinFilter)).

pub mod knn;
pub mod region;

pub use knn::{DistanceFn, KnnSearchEngine};
pub use region::{RegionResult, RegionSearchEngine, minimum_bounding_prefixes};

use crate::compute::spatial::cell::GeohashCell;
use crate::config::Config;
use crate::error::Result;
use crate::storage::{
    ID_COLUMN, LAT_COLUMN, LON_COLUMN, RangeStore, Row, ScanRequest, parse_coordinate,
};
use bytes::Bytes;
use geoscan_types::point::QueryMatch;

/// Turn a stored row into a match.
///
/// Returns `None` for rows that do not describe a point: a missing or
/// non-numeric coordinate, a missing id, or a key that is not UTF-8.
pub fn decode_row(row: &Row) -> Option<QueryMatch> {
    let code = std::str::from_utf8(&row.key).ok()?;
    let lon = parse_coordinate(row.column(LON_COLUMN)?)?;
    let lat = parse_coordinate(row.column(LAT_COLUMN)?)?;
    let id = std::str::from_utf8(row.column(ID_COLUMN)?).ok()?;
    Some(QueryMatch::new(id, code, lon, lat))
}

/// Scan every row under `cell`, handing each to `visit`.
///
/// Returns the number of rows the store produced.
pub(crate) fn scan_cell<S, F>(
    store: &S,
    config: &Config,
    cell: &GeohashCell,
    row_filter: Option<&Bytes>,
    mut visit: F,
) -> Result<usize>
where
    S: RangeStore + ?Sized,
    F: FnMut(Row),
{
    let mut request = ScanRequest::prefix(cell.code(), config.column_family.as_str())
        .with_cache_hint(config.scan_cache_hint)
        .with_max_versions(config.max_versions);
    if let Some(filter) = row_filter {
        request = request.with_row_filter(filter.clone());
    }

    let mut candidates = 0;
    for row in store.scan(&request)? {
        visit(row?);
        candidates += 1;
    }

    log::info!("Scan over '{}' returned {} candidates.", cell, candidates);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::spatial::cell::encode;
    use crate::storage::{DEFAULT_FAMILY, MemoryStore};

    #[test]
    fn test_decode_row() {
        let row = Row::new("s000000tz63t")
            .with_column(LON_COLUMN, "0.001")
            .with_column(LAT_COLUMN, "0.001")
            .with_column(ID_COLUMN, "a");

        let decoded = decode_row(&row).unwrap();
        assert_eq!(decoded.id, "a");
        assert_eq!(decoded.code, "s000000tz63t");
        assert_eq!(decoded.lon, 0.001);
        assert_eq!(decoded.lat, 0.001);
        assert_eq!(decoded.distance, None);
    }

    #[test]
    fn test_decode_row_rejects_malformed() {
        let missing_id = Row::new("s00")
            .with_column(LON_COLUMN, "0")
            .with_column(LAT_COLUMN, "0");
        let bad_lat = missing_id.clone().with_column(ID_COLUMN, "a").with_column(LAT_COLUMN, "x");

        assert!(decode_row(&missing_id).is_none());
        assert!(decode_row(&bad_lat).is_none());
        assert!(decode_row(&Row::new("s00")).is_none());
    }

    #[test]
    fn test_scan_cell_counts_rows() {
        let store = MemoryStore::new();
        let cell = encode(0.0, 0.0, 5).unwrap();
        for (i, lon) in [0.001, 0.002, 0.003].iter().enumerate() {
            let key = encode(*lon, 0.001, 12).unwrap();
            let row = Row::point(&key, lon.to_string(), "0.001", format!("p{i}"));
            store.put(DEFAULT_FAMILY, row).unwrap();
        }

        let mut seen = Vec::new();
        let count = scan_cell(&store, &Config::default(), &cell, None, |row| {
            seen.push(decode_row(&row).unwrap().id)
        })
        .unwrap();

        assert_eq!(count, 3);
        seen.sort();
        assert_eq!(seen, vec!["p0", "p1", "p2"]);
    }
}
