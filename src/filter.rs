//! Row predicate evaluated column by column inside a scan.
//!
//! A scan host drives the filter with a fixed protocol: [`WithinFilter::reset`]
//! before each row, [`WithinFilter::observe`] for every column of the row, and
//! a single [`WithinFilter::decide`] once the row is complete. The filter keeps
//! only the two coordinate columns between calls, so it can run inside a
//! remote scan pipeline that streams cells rather than whole rows.
//!
//! The filter travels to the host as a protobuf-compatible message with one
//! length-delimited field (tag 1) holding the query geometry as WKT:
//!
//! ```text
//! 0x0A | varint(len) | WKT bytes
//! ```

use crate::error::{GeoscanError, Result};
use crate::spatial::{contains, parse_wkt, to_wkt};
use crate::storage::{LAT_COLUMN, LON_COLUMN, Row, parse_coordinate};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use geo::Geometry;

/// Field 1, wire type 2 (length-delimited).
pub const QUERY_FIELD_TAG: u8 = 0x0A;

const MAX_VARINT_BYTES: usize = 10;

/// Outcome for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Exclude,
}

/// Where the filter is in the per-row protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Reset, no column observed yet.
    Idle,
    /// At least one column observed, no decision yet.
    Accumulating,
    /// Decision made; further `decide` calls return it.
    Decided(Decision),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Coordinate {
    Absent,
    Unparsable,
    Value(f64),
}

impl Coordinate {
    fn parse(value: &[u8]) -> Self {
        parse_coordinate(value).map_or(Coordinate::Unparsable, Coordinate::Value)
    }
}

/// Keeps rows whose `lon`/`lat` point lies inside a query geometry.
///
/// A row is excluded when no column was observed, when either coordinate is
/// missing or not numeric, or when the point falls outside the geometry.
/// Points on the geometry's boundary are kept.
///
/// # Examples
///
/// ```rust
/// use geoscan::filter::{Decision, WithinFilter};
///
/// let mut filter = WithinFilter::from_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))")?;
/// filter.reset();
/// filter.observe(b"lon", b"0.5");
/// filter.observe(b"lat", b"0.5");
/// assert_eq!(filter.decide(), Decision::Keep);
///
/// let restored = WithinFilter::deserialize(&filter.serialize())?;
/// assert_eq!(restored.query(), filter.query());
/// # Ok::<(), geoscan::GeoscanError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WithinFilter {
    query: Geometry,
    lon: Coordinate,
    lat: Coordinate,
    state: FilterState,
}

impl WithinFilter {
    pub fn new(query: Geometry) -> Self {
        Self {
            query,
            lon: Coordinate::Absent,
            lat: Coordinate::Absent,
            state: FilterState::Idle,
        }
    }

    pub fn from_wkt(text: &str) -> Result<Self> {
        Ok(Self::new(parse_wkt(text)?))
    }

    pub fn query(&self) -> &Geometry {
        &self.query
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Clear the coordinates of the previous row.
    pub fn reset(&mut self) {
        self.lon = Coordinate::Absent;
        self.lat = Coordinate::Absent;
        self.state = FilterState::Idle;
    }

    /// Record one column of the current row.
    ///
    /// Columns other than `lon` and `lat` are ignored. Observing a column
    /// after a decision starts a new row.
    pub fn observe(&mut self, column: &[u8], value: &[u8]) {
        if let FilterState::Decided(_) = self.state {
            self.reset();
        }
        self.state = FilterState::Accumulating;

        if column == LON_COLUMN {
            self.lon = Coordinate::parse(value);
        } else if column == LAT_COLUMN {
            self.lat = Coordinate::parse(value);
        }
    }

    /// Decide the current row. Idempotent until the next reset.
    pub fn decide(&mut self) -> Decision {
        let decision = match self.state {
            FilterState::Decided(decision) => return decision,
            FilterState::Idle => Decision::Exclude,
            FilterState::Accumulating => match (self.lon, self.lat) {
                (Coordinate::Value(lon), Coordinate::Value(lat))
                    if contains(&self.query, lon, lat) =>
                {
                    Decision::Keep
                }
                _ => Decision::Exclude,
            },
        };
        self.state = FilterState::Decided(decision);
        decision
    }

    /// Run a full reset/observe/decide cycle over a stored row.
    pub fn filter_row(&mut self, row: &Row) -> Decision {
        self.reset();
        for (column, value) in &row.columns {
            self.observe(column, value);
        }

        let decision = self.decide();
        if matches!(self.lon, Coordinate::Absent) || matches!(self.lat, Coordinate::Absent) {
            log::debug!("{} is not a point.", String::from_utf8_lossy(&row.key));
        }
        log::debug!(
            "Filter applied to {}. {}.",
            String::from_utf8_lossy(&row.key),
            match decision {
                Decision::Keep => "Keeping",
                Decision::Exclude => "Rejecting",
            }
        );
        decision
    }

    /// Encode the query geometry for transport to a scan host.
    pub fn serialize(&self) -> Bytes {
        let text = to_wkt(&self.query);
        let mut buf = BytesMut::with_capacity(text.len() + 1 + MAX_VARINT_BYTES);
        buf.put_u8(QUERY_FIELD_TAG);
        put_varint(&mut buf, text.len() as u64);
        buf.put_slice(text.as_bytes());
        buf.freeze()
    }

    /// Rebuild a filter from [`serialize`](Self::serialize) output.
    ///
    /// # Errors
    ///
    /// `PredicateDecode` for a malformed envelope, `GeometryParse` when the
    /// payload is not valid WKT.
    pub fn deserialize(mut bytes: &[u8]) -> Result<Self> {
        if !bytes.has_remaining() {
            return Err(decode_error("missing required field 'query'"));
        }

        let tag = bytes.get_u8();
        if tag != QUERY_FIELD_TAG {
            return Err(decode_error(format!("unexpected field tag 0x{tag:02x}")));
        }

        let len = get_varint(&mut bytes)?;
        let len = usize::try_from(len)
            .map_err(|_| decode_error(format!("field length {len} does not fit in memory")))?;
        if bytes.remaining() < len {
            return Err(decode_error(format!(
                "truncated payload: expected {len} bytes, found {}",
                bytes.remaining()
            )));
        }

        let (payload, rest) = bytes.split_at(len);
        if !rest.is_empty() {
            return Err(decode_error(format!(
                "{} trailing bytes after query field",
                rest.len()
            )));
        }

        let text = std::str::from_utf8(payload)
            .map_err(|e| decode_error(format!("query is not UTF-8: {e}")))?;
        Self::from_wkt(text)
    }
}

fn decode_error(message: impl Into<String>) -> GeoscanError {
    GeoscanError::PredicateDecode(message.into())
}

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

fn get_varint(buf: &mut &[u8]) -> Result<u64> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_BYTES {
        if !buf.has_remaining() {
            return Err(decode_error("truncated length varint"));
        }
        let byte = buf.get_u8();
        let bits = u64::from(byte & 0x7F);
        if i == MAX_VARINT_BYTES - 1 && bits > 1 {
            return Err(decode_error("length varint overflows 64 bits"));
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(decode_error("length varint longer than 10 bytes"))
}
