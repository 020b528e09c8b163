//! Spatial predicates and geometry helpers built on the geo crate.
//!
//! The region engine and the within filter both test containment through
//! [`contains`], so local and pushed-down evaluation agree on every row.
//! Geometry is built per call; there is no shared geometry factory.

use crate::compute::spatial::cell::GeohashCell;
use crate::error::{GeoscanError, Result};
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{
    ConvexHull, Coord, Distance, Euclidean, Geodesic, Geometry, Haversine, MultiPoint, Point,
    Polygon, Relate, Rhumb,
};
use serde::{Deserialize, Serialize};
use wkt::{ToWkt, TryFromWkt};

/// Distance metrics for ranking KNN candidates.
///
/// Different metrics are appropriate for different use cases:
/// - **Haversine**: Fast spherical distance, good for most lon/lat calculations
/// - **Geodesic**: More accurate ellipsoidal distance (Karney 2013), slower
/// - **Rhumb**: Constant bearing distance, useful for navigation
/// - **Euclidean**: Planar distance in degrees, only for projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Haversine formula - assumes spherical Earth, fast and accurate enough for most uses
    #[default]
    Haversine,
    /// Geodesic distance using Karney (2013) - more accurate, accounts for Earth's ellipsoid
    Geodesic,
    /// Rhumb line (loxodrome) - maintains constant bearing
    Rhumb,
    /// Euclidean distance - for planar/projected coordinates only
    Euclidean,
}

/// Calculate the distance between two points using the specified metric.
///
/// Returns meters for every metric except `Euclidean`, which returns the
/// planar distance in coordinate units.
///
/// # Examples
///
/// ```rust
/// use geo::Point;
/// use geoscan::spatial::{distance_between, DistanceMetric};
///
/// let nyc = Point::new(-74.0060, 40.7128);
/// let la = Point::new(-118.2437, 34.0522);
///
/// let dist = distance_between(&nyc, &la, DistanceMetric::Haversine);
/// assert!(dist > 3_900_000.0); // ~3,944 km
/// ```
pub fn distance_between(point1: &Point, point2: &Point, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Haversine => Haversine.distance(*point1, *point2),
        DistanceMetric::Geodesic => Geodesic.distance(*point1, *point2),
        DistanceMetric::Rhumb => Rhumb.distance(*point1, *point2),
        DistanceMetric::Euclidean => Euclidean.distance(*point1, *point2),
    }
}

/// Exact planar point-in-geometry test.
///
/// The boundary counts as inside: a point on an edge or a vertex is
/// contained. Non-finite coordinates are never contained.
///
/// # Examples
///
/// ```rust
/// use geoscan::spatial::{contains, parse_wkt};
///
/// let square = parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))")?;
/// assert!(contains(&square, 0.5, 0.5));
/// assert!(contains(&square, 1.0, 0.5));
/// assert!(!contains(&square, 1.5, 0.5));
/// # Ok::<(), geoscan::GeoscanError>(())
/// ```
pub fn contains(geometry: &Geometry, lon: f64, lat: f64) -> bool {
    if !lon.is_finite() || !lat.is_finite() {
        return false;
    }
    geometry.coordinate_position(&Coord { x: lon, y: lat }) != CoordPos::Outside
}

/// Smallest convex polygon enclosing `coords`, or `None` for no input.
pub fn convex_hull(coords: &[Coord]) -> Option<Polygon> {
    if coords.is_empty() {
        return None;
    }

    let multi_point: MultiPoint = coords.iter().map(|c| Point::from(*c)).collect();
    Some(multi_point.convex_hull())
}

/// The four bounding-box corners of a geohash cell.
pub fn cell_corners(cell: &GeohashCell) -> [Coord; 4] {
    cell.corners()
}

/// Convex hull of the corners of every cell in `cells`, laid out around
/// `anchor`.
///
/// A cell whose center is more than 180° of longitude away from the anchor's
/// wrapped across the antimeridian; its corners are shifted by 360° so the
/// hull spans the block itself rather than the whole latitude band.
pub fn cells_hull<'a>(
    anchor: &GeohashCell,
    cells: impl IntoIterator<Item = &'a GeohashCell>,
) -> Option<Polygon> {
    let anchor_lon = anchor.bounding_box().center().x;
    let coords: Vec<Coord> = cells
        .into_iter()
        .flat_map(|cell| {
            let offset = anchor_lon - cell.bounding_box().center().x;
            let shift = if offset > 180.0 {
                360.0
            } else if offset < -180.0 {
                -360.0
            } else {
                0.0
            };
            cell_corners(cell).map(|c| Coord {
                x: c.x + shift,
                y: c.y,
            })
        })
        .collect();
    convex_hull(&coords)
}

/// Whether `hull` contains `geometry` in the DE-9IM sense.
///
/// Used as a superset test when choosing scan prefixes, never as the final
/// row predicate.
pub fn hull_contains(hull: &Polygon, geometry: &Geometry) -> bool {
    hull.relate(geometry).is_contains()
}

/// Parse well-known text into a geometry.
///
/// # Errors
///
/// Returns `GeometryParse` if the text is not valid WKT.
pub fn parse_wkt(text: &str) -> Result<Geometry> {
    Geometry::try_from_wkt_str(text.trim())
        .map_err(|e| GeoscanError::GeometryParse(format!("{:?}", e)))
}

/// Format a geometry as well-known text.
pub fn to_wkt(geometry: &Geometry) -> String {
    geometry.wkt_string()
}
