//! Bulk loading of point records from delimited text.
//!
//! The input is line oriented with a header line first:
//!
//! ```text
//! lon,lat,id
//! -5.6,42.6,madrid-north
//! 0.001,0.001,a
//! ```
//!
//! Each record is keyed by its geohash at the configured ingest precision and
//! written with its coordinate text as given. Lines that do not start with two
//! numeric fields are skipped and counted.

use crate::compute::spatial::cell::encode;
use crate::config::Config;
use crate::error::{GeoscanError, Result};
use crate::storage::{RangeStore, Row, StorageOp, parse_coordinate};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

/// Fields per line, in order: lon, lat, id. The id keeps any extra commas.
const MAX_FIELDS: usize = 3;

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Rows written to the store.
    pub records: usize,
    /// Data lines skipped as malformed.
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Parse one data line into a keyed row.
///
/// # Errors
///
/// `Parse` when fewer than two fields are present or a coordinate is not a
/// finite number; `InvalidCoordinate` when it is out of range.
pub fn parse_line(line: &str, config: &Config) -> Result<Row> {
    let mut fields = line.splitn(MAX_FIELDS, ',').map(str::trim);

    let lon_text = fields
        .next()
        .filter(|field| !field.is_empty())
        .ok_or_else(|| GeoscanError::Parse("missing lon field".to_string()))?;
    let lat_text = fields
        .next()
        .ok_or_else(|| GeoscanError::Parse("missing lat field".to_string()))?;
    let id = fields.next().unwrap_or_default();

    let lon = parse_coordinate(lon_text.as_bytes())
        .ok_or_else(|| GeoscanError::Parse(format!("invalid lon '{lon_text}'")))?;
    let lat = parse_coordinate(lat_text.as_bytes())
        .ok_or_else(|| GeoscanError::Parse(format!("invalid lat '{lat_text}'")))?;

    let cell = encode(lon, lat, config.ingest_precision)?;
    Ok(Row::point(
        &cell,
        lon_text.to_string(),
        lat_text.to_string(),
        id.to_string(),
    ))
}

/// Load every data line of `reader` into `store`.
///
/// The first line is treated as a header and dropped. Rows are written in
/// batches of `config.ingest_batch_size`.
pub fn ingest_delimited<R, S>(reader: R, store: &S, config: &Config) -> Result<IngestReport>
where
    R: BufRead,
    S: RangeStore + ?Sized,
{
    config.validate()?;
    let start = Instant::now();
    let mut report = IngestReport::default();
    let mut pending = Vec::with_capacity(config.ingest_batch_size);

    for (index, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line, config) {
            Ok(row) => {
                pending.push(StorageOp::Put {
                    family: config.column_family.clone(),
                    row,
                });
                report.records += 1;
            }
            Err(e) => {
                log::warn!("Skipping line {}: {}", index + 1, e);
                report.skipped += 1;
                continue;
            }
        }

        if pending.len() >= config.ingest_batch_size {
            store.batch(std::mem::take(&mut pending))?;
        }
    }

    if !pending.is_empty() {
        store.batch(pending)?;
    }

    report.elapsed = start.elapsed();
    log::info!(
        "Geohashed {} records in {}ms.",
        report.records,
        report.elapsed.as_millis()
    );
    Ok(report)
}

/// Load a delimited text file into `store`.
pub fn ingest_file<P, S>(path: P, store: &S, config: &Config) -> Result<IngestReport>
where
    P: AsRef<Path>,
    S: RangeStore + ?Sized,
{
    let file = File::open(path.as_ref())?;
    ingest_delimited(BufReader::new(file), store, config)
}
