//! Geohash cell codec.
//!
//! Encoding, decoding and neighbor lookup are delegated to the `geohash`
//! crate. Neighbors follow a fixed policy at the edges of the map:
//!
//! - longitude wraps: the east neighbor of a cell touching 180° is the cell
//!   touching -180° on the same row, and vice versa;
//! - latitude clamps: a neighbor that would lie beyond a pole is replaced by
//!   the cell on the current row in the same column. The north neighbor of a
//!   top-row cell is the cell itself, and its NE/NW neighbors are its E/W
//!   neighbors.
//!
//! Because of the clamp, `neighbors` can contain duplicates and the cell
//! itself near a pole. [`neighborhood`] returns the deduplicated 3x3 block and
//! is what the query engines scan.

use crate::compute::validation::{validate_lon_lat, validate_precision};
use crate::error::{GeoscanError, Result};
use geo::{Coord, Rect};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Coarsest geohash precision (one character, 45° x 45° cells).
pub const MIN_PRECISION: usize = 1;

/// Finest geohash precision supported by the codec.
pub const MAX_PRECISION: usize = 12;

/// The eight compass directions, in the order [`neighbors`] returns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Offset in cell widths/heights as `(dlon, dlat)`.
    pub fn offset(&self) -> (f64, f64) {
        match self {
            Direction::North => (0.0, 1.0),
            Direction::NorthEast => (1.0, 1.0),
            Direction::East => (1.0, 0.0),
            Direction::SouthEast => (1.0, -1.0),
            Direction::South => (0.0, -1.0),
            Direction::SouthWest => (-1.0, -1.0),
            Direction::West => (-1.0, 0.0),
            Direction::NorthWest => (-1.0, 1.0),
        }
    }
}

impl From<Direction> for geohash::Direction {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::North => geohash::Direction::N,
            Direction::NorthEast => geohash::Direction::NE,
            Direction::East => geohash::Direction::E,
            Direction::SouthEast => geohash::Direction::SE,
            Direction::South => geohash::Direction::S,
            Direction::SouthWest => geohash::Direction::SW,
            Direction::West => geohash::Direction::W,
            Direction::NorthWest => geohash::Direction::NW,
        }
    }
}

/// A geohash cell: a base-32 code and the rectangle it stands for.
///
/// Cells compare, order and hash by their code only. Ordering by code is the
/// key-space ordering of the rows stored under them.
#[derive(Debug, Clone)]
pub struct GeohashCell {
    code: String,
    bbox: Rect<f64>,
}

impl GeohashCell {
    /// Parse a geohash code.
    ///
    /// # Errors
    ///
    /// `InvalidPrecision` if the code is empty or longer than 12 characters,
    /// `InvalidGeohash` if it contains characters outside the geohash alphabet.
    pub fn parse(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        let bbox = decode(&code)?;
        Ok(Self { code, bbox })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Number of characters in the code.
    pub fn precision(&self) -> usize {
        self.code.len()
    }

    pub fn bounding_box(&self) -> Rect<f64> {
        self.bbox
    }

    /// The four corners of the cell's bounding box:
    /// `(min, min)`, `(min, max)`, `(max, min)`, `(max, max)`.
    pub fn corners(&self) -> [Coord<f64>; 4] {
        let (min, max) = (self.bbox.min(), self.bbox.max());
        [
            Coord { x: min.x, y: min.y },
            Coord { x: min.x, y: max.y },
            Coord { x: max.x, y: min.y },
            Coord { x: max.x, y: max.y },
        ]
    }

    /// Whether a row key falls under this cell's prefix.
    pub fn is_prefix_of(&self, key: &[u8]) -> bool {
        key.starts_with(self.code.as_bytes())
    }

    /// The cell one precision coarser, or `None` at precision 1.
    pub fn parent(&self) -> Option<GeohashCell> {
        if self.precision() <= MIN_PRECISION {
            return None;
        }
        GeohashCell::parse(&self.code[..self.code.len() - 1]).ok()
    }
}

impl PartialEq for GeohashCell {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for GeohashCell {}

impl PartialOrd for GeohashCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GeohashCell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code.cmp(&other.code)
    }
}

impl Hash for GeohashCell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl fmt::Display for GeohashCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl AsRef<[u8]> for GeohashCell {
    fn as_ref(&self) -> &[u8] {
        self.code.as_bytes()
    }
}

/// Encode a point into the cell of the given precision that contains it.
///
/// # Examples
///
/// ```rust
/// use geoscan::compute::spatial::cell::encode;
///
/// let cell = encode(-5.6, 42.6, 5)?;
/// assert_eq!(cell.code(), "ezs42");
/// # Ok::<(), geoscan::GeoscanError>(())
/// ```
pub fn encode(lon: f64, lat: f64, precision: usize) -> Result<GeohashCell> {
    validate_precision(precision)?;
    validate_lon_lat(lon, lat)?;

    // The closed upper edges belong to the last column and row.
    let lon = if lon == 180.0 { lon.next_down() } else { lon };
    let lat = if lat == 90.0 { lat.next_down() } else { lat };

    let code = geohash::encode(geohash::Coord { x: lon, y: lat }, precision)
        .map_err(|e| GeoscanError::InvalidGeohash(e.to_string()))?;
    GeohashCell::parse(code)
}

/// Decode a geohash code into the bounding box of its cell.
///
/// The mapping is lossy: every point inside the box encodes to `code`.
pub fn decode(code: &str) -> Result<Rect<f64>> {
    validate_precision(code.len())?;
    geohash::decode_bbox(code).map_err(|e| GeoscanError::InvalidGeohash(format!("{code}: {e}")))
}

/// The neighbor of `cell` in one direction, at the same precision.
///
/// Delegates to `geohash::neighbor`, which already wraps longitude. A step
/// past a pole is clamped here instead, since the crate would wrap it to the
/// opposite pole.
pub fn neighbor(cell: &GeohashCell, direction: Direction) -> Result<GeohashCell> {
    let bbox = cell.bounding_box();
    let center = bbox.center();
    let (dlon, dlat) = direction.offset();

    if !(-90.0..=90.0).contains(&(center.y + dlat * bbox.height())) {
        let clamped = match dlon {
            d if d > 0.0 => Direction::East,
            d if d < 0.0 => Direction::West,
            _ => return Ok(cell.clone()),
        };
        return neighbor(cell, clamped);
    }

    let code = geohash::neighbor(cell.code(), direction.into())
        .map_err(|e| GeoscanError::InvalidGeohash(format!("{}: {e}", cell.code())))?;
    GeohashCell::parse(code)
}

/// The eight cells around `cell` in N, NE, E, SE, S, SW, W, NW order.
pub fn neighbors(cell: &GeohashCell) -> Result<[GeohashCell; 8]> {
    let [n, ne, e, se, s, sw, w, nw] = Direction::ALL.map(|direction| neighbor(cell, direction));
    Ok([n?, ne?, e?, se?, s?, sw?, w?, nw?])
}

/// `cell` together with its neighbors, deduplicated and sorted by code.
///
/// Away from the poles this is exactly nine cells.
pub fn neighborhood(cell: &GeohashCell) -> Result<SmallVec<[GeohashCell; 9]>> {
    let mut cells: SmallVec<[GeohashCell; 9]> = SmallVec::new();
    cells.push(cell.clone());
    cells.extend(neighbors(cell)?);
    cells.sort();
    cells.dedup();
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn codes(cells: &[GeohashCell]) -> Vec<&str> {
        cells.iter().map(GeohashCell::code).collect()
    }

    #[test]
    fn test_encode_known_value() {
        assert_eq!(encode(-5.6, 42.6, 5).unwrap().code(), "ezs42");
        assert_eq!(encode(0.0, 0.0, 12).unwrap().code(), "s00000000000");
        assert_eq!(encode(0.0, 0.0, 1).unwrap().code(), "s");
    }

    #[test]
    fn test_decode_contains_encoded_point() {
        let points = [
            (-5.6, 42.6),
            (0.0, 0.0),
            (-74.0060, 40.7128),
            (139.6917, 35.6895),
            (-179.9999, -89.9999),
            (180.0, 90.0),
        ];

        for (lon, lat) in points {
            for precision in MIN_PRECISION..=MAX_PRECISION {
                let cell = encode(lon, lat, precision).unwrap();
                let bbox = decode(cell.code()).unwrap();
                assert!(
                    bbox.min().x <= lon && lon <= bbox.max().x,
                    "lon {lon} outside {cell} at precision {precision}"
                );
                assert!(
                    bbox.min().y <= lat && lat <= bbox.max().y,
                    "lat {lat} outside {cell} at precision {precision}"
                );
            }
        }
    }

    #[test]
    fn test_precision_bounds() {
        assert!(matches!(
            encode(0.0, 0.0, 0),
            Err(GeoscanError::InvalidPrecision(0))
        ));
        assert!(matches!(
            encode(0.0, 0.0, 13),
            Err(GeoscanError::InvalidPrecision(13))
        ));
        assert!(matches!(
            GeohashCell::parse(""),
            Err(GeoscanError::InvalidPrecision(0))
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            encode(181.0, 0.0, 5),
            Err(GeoscanError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            GeohashCell::parse("ezs4a"),
            Err(GeoscanError::InvalidGeohash(_))
        ));
    }

    #[test]
    fn test_neighbors_known_cell() {
        let cell = GeohashCell::parse("dqcjq").unwrap();
        let around = neighbors(&cell).unwrap();
        assert_eq!(
            codes(&around),
            vec!["dqcjw", "dqcjx", "dqcjr", "dqcjp", "dqcjn", "dqcjj", "dqcjm", "dqcjt"]
        );
    }

    #[test]
    fn test_neighbors_are_distinct_and_exclude_self() {
        for (lon, lat) in [(0.0_f64, 0.0_f64), (-5.6, 42.6), (-74.0, 40.7), (151.2, -33.8)] {
            for precision in 1..=12 {
                if precision == 1 && lat.abs() > 0.0 {
                    // Single-character cells touching a pole hit the clamp.
                    continue;
                }
                let cell = encode(lon, lat, precision).unwrap();
                let around = neighbors(&cell).unwrap();
                let unique: HashSet<&str> = around.iter().map(GeohashCell::code).collect();
                assert_eq!(unique.len(), 8, "duplicates around {cell}");
                assert!(!unique.contains(cell.code()));
                assert!(around.iter().all(|c| c.precision() == precision));
            }
        }
    }

    #[test]
    fn test_neighbors_cross_prime_meridian_and_equator() {
        let cell = encode(0.0, 0.0, 7).unwrap();
        assert_eq!(cell.code(), "s000000");
        let around = neighbors(&cell).unwrap();
        assert_eq!(
            codes(&around),
            vec![
                "s000002", "s000003", "s000001", "kpbpbpc", "kpbpbpb", "7zzzzzz", "ebpbpbp",
                "ebpbpbr"
            ]
        );
    }

    #[test]
    fn test_neighbors_match_geohash_crate_in_interior() {
        let cell = GeohashCell::parse("9q60y60rhs").unwrap();
        let expected = geohash::neighbors(cell.code()).unwrap();
        let around = neighbors(&cell).unwrap();
        assert_eq!(
            codes(&around),
            vec![
                expected.n.as_str(),
                expected.ne.as_str(),
                expected.e.as_str(),
                expected.se.as_str(),
                expected.s.as_str(),
                expected.sw.as_str(),
                expected.w.as_str(),
                expected.nw.as_str(),
            ]
        );
    }

    #[test]
    fn test_neighbors_wrap_antimeridian() {
        let cell = encode(179.99, 0.0, 3).unwrap();
        assert_eq!(cell.code(), "xbp");

        let east = neighbor(&cell, Direction::East).unwrap();
        assert_eq!(east.code(), "800");
        assert!(east.bounding_box().min().x == -180.0);

        let west_of_east = neighbor(&east, Direction::West).unwrap();
        assert_eq!(west_of_east, cell);
    }

    #[test]
    fn test_neighbors_clamp_at_pole() {
        let cell = encode(0.0, 89.9, 2).unwrap();
        assert_eq!(cell.code(), "up");

        let around = neighbors(&cell).unwrap();
        assert_eq!(
            codes(&around),
            vec!["up", "ur", "ur", "uq", "un", "gy", "gz", "gz"]
        );

        let block = neighborhood(&cell).unwrap();
        assert_eq!(codes(&block), vec!["gy", "gz", "un", "up", "uq", "ur"]);
    }

    #[test]
    fn test_neighborhood_is_nine_sorted_cells() {
        let cell = encode(-5.6, 42.6, 6).unwrap();
        let block = neighborhood(&cell).unwrap();
        assert_eq!(block.len(), 9);
        assert!(block.windows(2).all(|w| w[0] < w[1]));
        assert!(block.contains(&cell));
    }

    #[test]
    fn test_corners_and_prefix() {
        let cell = GeohashCell::parse("s0").unwrap();
        let corners = cell.corners();
        assert_eq!(corners[0], Coord { x: 0.0, y: 0.0 });
        assert_eq!(corners[3], Coord { x: 11.25, y: 5.625 });

        assert!(cell.is_prefix_of(b"s00000000000"));
        assert!(!cell.is_prefix_of(b"s1000000000"));
        assert_eq!(cell.parent().unwrap().code(), "s");
        assert!(cell.parent().unwrap().parent().is_none());
    }
}
