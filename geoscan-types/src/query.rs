use geo::Geometry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A query against a geohash-keyed point table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialQuery {
    /// The `k` records nearest to `(lon, lat)`.
    Knn { lon: f64, lat: f64, k: usize },
    /// Every record inside `polygon`.
    Region { polygon: Geometry<f64> },
}

/// Where the containment predicate of a region query is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Scan raw rows and test containment in the querying process.
    #[default]
    Local,
    /// Ship the predicate with the scan and let the store drop rows.
    Pushdown,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Local => "local",
            QueryMode::Pushdown => "pushdown",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known [`QueryMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseQueryModeError(pub String);

impl fmt::Display for ParseQueryModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown query mode '{}', expected 'local' or 'pushdown'",
            self.0
        )
    }
}

impl std::error::Error for ParseQueryModeError {}

impl FromStr for QueryMode {
    type Err = ParseQueryModeError;

    /// Accepts `local`, `pushdown`, and `remote` as an alias for pushdown.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(QueryMode::Local),
            "pushdown" | "remote" => Ok(QueryMode::Pushdown),
            _ => Err(ParseQueryModeError(s.to_string())),
        }
    }
}
