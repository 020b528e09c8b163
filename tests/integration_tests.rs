use geoscan::filter::{Decision, WithinFilter};
use geoscan::prelude::*;
use geoscan::spatial::parse_wkt;
use geoscan::storage::{RowIter, ScanRequest, StorageOp, StorageStats};
use geoscan::{Row, ingest};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const SQUARE_AROUND_ORIGIN: &str = "POLYGON((-0.5 -0.5, 0.5 -0.5, 0.5 0.5, -0.5 0.5, -0.5 -0.5))";

fn ids(matches: &[QueryMatch]) -> Vec<&str> {
    matches.iter().map(|m| m.id.as_str()).collect()
}

fn three_point_index() -> GeoIndex {
    let index = GeoIndex::memory().expect("Failed to create index");
    index
        .insert_batch(&[
            PointRecord::new("a", 0.0, 0.0),
            PointRecord::new("b", 0.001, 0.001),
            PointRecord::new("c", 50.0, 50.0),
        ])
        .expect("Failed to insert points");
    index
}

#[test]
fn test_knn_returns_nearest_in_order() {
    init_logging();
    let index = three_point_index();

    let nearest = index.knn(0.0, 0.0, 2).expect("KNN failed");
    assert_eq!(ids(&nearest), vec!["a", "b"]);
    assert_eq!(nearest[0].distance, Some(0.0));
    assert!(nearest[1].distance.unwrap() > 0.0);
}

#[test]
fn test_region_returns_contained_points() {
    init_logging();
    let index = three_point_index();

    for mode in [QueryMode::Local, QueryMode::Pushdown] {
        let result = index
            .within_wkt(SQUARE_AROUND_ORIGIN, mode)
            .expect("Region query failed");
        assert_eq!(result.ids(), vec!["a", "b"], "mode {mode}");
        assert_eq!(result.prefixes.len(), 9);
    }
}

#[test]
fn test_local_mode_reports_excluded_rows() {
    init_logging();
    let index = three_point_index();
    // Inside the scanned block, outside the square.
    index
        .insert(&PointRecord::new("d", 0.7, 0.7))
        .expect("Failed to insert point");

    let local = index
        .within_wkt(SQUARE_AROUND_ORIGIN, QueryMode::Local)
        .unwrap();
    assert_eq!(local.ids(), vec!["a", "b"]);
    assert_eq!(local.excluded, Some(1));

    let pushdown = index
        .within_wkt(SQUARE_AROUND_ORIGIN, QueryMode::Pushdown)
        .unwrap();
    assert_eq!(pushdown.excluded, None);
    assert_eq!(index.stats().unwrap().rows_filtered, 1);
}

#[test]
fn test_knn_with_fewer_points_than_k() {
    let index = three_point_index();
    let all = index.knn(0.0, 0.0, 10).expect("KNN failed");
    // "c" is beyond the coarsest neighborhood around the origin.
    assert_eq!(ids(&all), vec!["a", "b"]);
    assert!(all.windows(2).all(|w| w[0].distance <= w[1].distance));

    let index = GeoIndex::memory().unwrap();
    index.insert(&PointRecord::new("x", 10.0, 10.0)).unwrap();
    index.insert(&PointRecord::new("y", 10.5, 10.5)).unwrap();
    let all = index.knn(10.2, 10.2, 5).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_local_and_pushdown_agree_on_grid() {
    init_logging();
    let index = GeoIndex::memory().unwrap();
    let mut records = Vec::new();
    for i in -20..=20 {
        for j in -20..=20 {
            let lon = 10.0 + i as f64 * 0.025;
            let lat = 45.0 + j as f64 * 0.025;
            records.push(PointRecord::new(format!("p{i}_{j}"), lon, lat));
        }
    }
    index.insert_batch(&records).unwrap();

    let polygons = [
        "POLYGON((9.8 44.8, 10.2 44.8, 10.2 45.2, 9.8 45.2, 9.8 44.8))",
        "POLYGON((9.9 44.9, 10.3 45.0, 10.0 45.3, 9.9 44.9))",
        "POLYGON((9.7 44.7, 10.3 44.7, 10.3 45.3, 9.7 45.3, 9.7 44.7), (9.9 44.9, 10.1 44.9, 10.1 45.1, 9.9 45.1, 9.9 44.9))",
        "MULTIPOLYGON(((9.95 44.95, 10.0 44.95, 10.0 45.0, 9.95 45.0, 9.95 44.95)), ((10.05 45.05, 10.1 45.05, 10.1 45.1, 10.05 45.1, 10.05 45.05)))",
    ];

    for wkt in polygons {
        let local = index.within_wkt(wkt, QueryMode::Local).unwrap();
        let pushdown = index.within_wkt(wkt, QueryMode::Pushdown).unwrap();
        assert!(!local.is_empty(), "no matches for {wkt}");
        assert_eq!(local.ids(), pushdown.ids(), "modes disagree for {wkt}");

        let geometry = parse_wkt(wkt).unwrap();
        for m in &local.matches {
            assert!(geoscan::spatial::contains(&geometry, m.lon, m.lat));
        }
    }
}

#[test]
fn test_serialized_filter_decides_like_original() {
    let original = WithinFilter::from_wkt(
        "POLYGON((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 3 1, 3 3, 1 3, 1 1))",
    )
    .unwrap();
    let mut restored = WithinFilter::deserialize(&original.serialize()).unwrap();
    let mut original = original;

    let rows = [
        ("0.5", "0.5"),
        ("2", "2"),
        ("4", "4"),
        ("1", "2"),
        ("5", "0"),
        ("x", "1"),
    ];
    for (lon, lat) in rows {
        let row = Row::new("k")
            .with_column("lon", lon.to_string())
            .with_column("lat", lat.to_string());
        assert_eq!(
            original.filter_row(&row),
            restored.filter_row(&row),
            "decisions differ for ({lon}, {lat})"
        );
    }
    assert_eq!(original.filter_row(&Row::new("empty")), Decision::Exclude);
}

#[test]
fn test_ingest_file_then_query() {
    init_logging();
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "lon,lat,id").unwrap();
    writeln!(file, "0,0,a").unwrap();
    writeln!(file, "0.001,0.001,b").unwrap();
    writeln!(file, "oops,0,bad").unwrap();
    writeln!(file, "50,50,c").unwrap();
    file.flush().unwrap();

    let index = GeoIndex::memory().unwrap();
    let report = index.ingest_file(file.path()).expect("Ingest failed");
    assert_eq!(report.records, 3);
    assert_eq!(report.skipped, 1);

    assert_eq!(ids(&index.knn(0.0, 0.0, 2).unwrap()), vec!["a", "b"]);
    let region = index
        .within_wkt(SQUARE_AROUND_ORIGIN, QueryMode::Pushdown)
        .unwrap();
    assert_eq!(region.ids(), vec!["a", "b"]);
}

#[test]
fn test_ingest_missing_file() {
    let store = MemoryStore::new();
    let result = ingest::ingest_file("/nonexistent/points.csv", &store, &Config::default());
    assert!(matches!(result, Err(GeoscanError::Io(_))));
}

#[test]
fn test_closed_store_is_unavailable() {
    let index = three_point_index();
    index.close().unwrap();

    assert!(matches!(
        index.knn(0.0, 0.0, 1),
        Err(GeoscanError::StoreUnavailable(_))
    ));
    assert!(matches!(
        index.within_wkt(SQUARE_AROUND_ORIGIN, QueryMode::Local),
        Err(GeoscanError::StoreUnavailable(_))
    ));
    assert!(matches!(
        index.insert(&PointRecord::new("z", 1.0, 1.0)),
        Err(GeoscanError::StoreUnavailable(_))
    ));
}

/// Store wrapper that records every scan request it serves.
struct RecordingStore {
    inner: MemoryStore,
    requests: Mutex<Vec<ScanRequest>>,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl RangeStore for RecordingStore {
    fn scan(&self, request: &ScanRequest) -> geoscan::Result<RowIter<'_>> {
        self.requests.lock().push(request.clone());
        self.inner.scan(request)
    }

    fn put(&self, family: &str, row: Row) -> geoscan::Result<()> {
        self.inner.put(family, row)
    }

    fn delete(&self, family: &str, key: &[u8]) -> geoscan::Result<Option<Row>> {
        self.inner.delete(family, key)
    }

    fn batch(&self, ops: Vec<StorageOp>) -> geoscan::Result<()> {
        self.inner.batch(ops)
    }

    fn len(&self) -> geoscan::Result<usize> {
        self.inner.len()
    }

    fn stats(&self) -> geoscan::Result<StorageStats> {
        self.inner.stats()
    }

    fn close(&self) -> geoscan::Result<()> {
        self.inner.close()
    }
}

#[test]
fn test_scan_requests_carry_configuration() {
    let store = Arc::new(RecordingStore::new());
    let config = Config::default()
        .with_column_family("geo")
        .with_scan_cache_hint(7);
    let index = GeoIndexBuilder::new()
        .config(config)
        .build_with_store(store.clone())
        .unwrap();
    index.insert(&PointRecord::new("a", 0.0, 0.0)).unwrap();

    index
        .within_wkt(SQUARE_AROUND_ORIGIN, QueryMode::Local)
        .unwrap();
    {
        let requests = store.requests.lock();
        assert_eq!(requests.len(), 9);
        assert!(requests.iter().all(|r| r.row_filter.is_none()));
        assert!(requests.iter().all(|r| r.family == "geo" && r.cache_hint == 7));
        assert!(requests.iter().all(|r| r.max_versions == 1));
        assert!(requests.windows(2).all(|w| w[0].prefix < w[1].prefix));
    }
    store.requests.lock().clear();

    let result = index
        .within_wkt(SQUARE_AROUND_ORIGIN, QueryMode::Pushdown)
        .unwrap();
    assert_eq!(result.ids(), vec!["a"]);
    let requests = store.requests.lock();
    assert_eq!(requests.len(), 9);
    let filter = requests[0].row_filter.clone().expect("missing row filter");
    assert!(requests.iter().all(|r| r.row_filter.as_ref() == Some(&filter)));
    let decoded = WithinFilter::deserialize(&filter).unwrap();
    assert_eq!(decoded.query(), &parse_wkt(SQUARE_AROUND_ORIGIN).unwrap());
}

#[test]
fn test_engines_share_store_across_threads() {
    let index = three_point_index();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let index = index.clone();
            std::thread::spawn(move || {
                index
                    .insert(&PointRecord::new(format!("t{i}"), 20.0 + i as f64, 20.0))
                    .unwrap();
                index.knn(0.0, 0.0, 2).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let nearest = handle.join().expect("query thread panicked");
        assert_eq!(ids(&nearest), vec!["a", "b"]);
    }
    assert_eq!(index.len().unwrap(), 7);
}
