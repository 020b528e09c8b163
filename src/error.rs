//! Error types for geoscan.

use geoscan_types::query::ParseQueryModeError;
use thiserror::Error;

/// Errors returned by the codec, the query engines, the row filter and the
/// store adapters.
///
/// Row-level problems (a row without coordinates, an empty row) are never
/// reported through this type; such rows are dropped from results.
#[derive(Error, Debug)]
pub enum GeoscanError {
    /// Geohash precision outside 1..=12.
    #[error("Invalid geohash precision {0}, expected 1..=12")]
    InvalidPrecision(usize),

    /// Coordinate outside the lon [-180, 180] / lat [-90, 90] range.
    #[error("Invalid coordinate: lon={lon}, lat={lat}")]
    InvalidCoordinate { lon: f64, lat: f64 },

    /// Geohash string containing characters outside the base-32 alphabet.
    #[error("Invalid geohash: {0}")]
    InvalidGeohash(String),

    /// Query input rejected before any scan was issued (e.g. k = 0).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Coordinate text that is not a number, or an unknown query mode.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Well-known text that does not describe a geometry.
    #[error("Geometry parse error: {0}")]
    GeometryParse(String),

    /// No precision between the configured maximum and 1 yields a prefix set
    /// covering the query geometry.
    #[error("Geometry cannot be covered by geohash prefixes")]
    UnboundableQuery,

    /// Serialized row predicate is corrupt or truncated.
    #[error("Predicate decode error: {0}")]
    PredicateDecode(String),

    /// The range store rejected or failed a request.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid configuration values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error while reading an ingestion source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for geoscan operations.
pub type Result<T> = std::result::Result<T, GeoscanError>;

impl From<ParseQueryModeError> for GeoscanError {
    fn from(err: ParseQueryModeError) -> Self {
        GeoscanError::Parse(err.to_string())
    }
}
