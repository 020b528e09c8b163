use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A stored point record: an opaque identifier at a longitude/latitude.
///
/// Coordinates are decimal degrees. Range checking is the caller's job.
///
/// # Examples
///
/// ```
/// use geoscan_types::point::PointRecord;
///
/// let record = PointRecord::new("cafe-wifi", 2.3522, 48.8566);
/// assert_eq!(record.point().x(), 2.3522);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
}

impl PointRecord {
    pub fn new(id: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            id: id.into(),
            lon,
            lat,
        }
    }

    /// The record's location as a `geo::Point` (x = lon, y = lat).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// A record returned by a KNN or region query.
///
/// `code` is the row key the record was read from. `distance` is only
/// populated by KNN queries.
///
/// Two matches are equal when their ids are equal, so a collection of
/// matches behaves as a set keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub code: String,
    pub lon: f64,
    pub lat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl QueryMatch {
    pub fn new(id: impl Into<String>, code: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            lon,
            lat,
            distance: None,
        }
    }

    pub fn from_record(record: &PointRecord, code: impl Into<String>) -> Self {
        Self::new(record.id.clone(), code, record.lon, record.lat)
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    pub fn to_record(&self) -> PointRecord {
        PointRecord::new(self.id.clone(), self.lon, self.lat)
    }
}

impl PartialEq for QueryMatch {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for QueryMatch {}

impl Hash for QueryMatch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for QueryMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}, {}", self.id, self.code, self.lon, self.lat)?;
        if let Some(distance) = self.distance {
            write!(f, ", {}", distance)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn matches_are_keyed_by_id() {
        let a = QueryMatch::new("a", "s00000000000", 0.0, 0.0);
        let a_elsewhere = QueryMatch::new("a", "s00twy01mtw0", 0.001, 0.001).with_distance(3.0);
        let b = QueryMatch::new("b", "s00000000000", 0.0, 0.0);

        assert_eq!(a, a_elsewhere);
        assert_ne!(a, b);

        let set: HashSet<QueryMatch> = [a, a_elsewhere, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_includes_distance_when_present() {
        let m = QueryMatch::new("x", "u4pruyd", 10.5, 57.6);
        assert_eq!(m.to_string(), "x, u4pruyd, 10.5, 57.6");

        let m = m.with_distance(12.5);
        assert_eq!(m.to_string(), "x, u4pruyd, 10.5, 57.6, 12.5");
    }

    #[test]
    fn record_round_trips_through_match() {
        let record = PointRecord::new("r", -1.25, 51.75);
        let m = QueryMatch::from_record(&record, "gcpn7");
        assert_eq!(m.to_record(), record);
        assert_eq!(m.point(), record.point());
    }
}
