//! Validation for query inputs: coordinates, geohash precision and `k`.

use crate::compute::spatial::cell::{MAX_PRECISION, MIN_PRECISION};
use crate::error::{GeoscanError, Result};

/// Validates that a longitude/latitude pair is finite and in range.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use geoscan::compute::validation::validate_lon_lat;
///
/// assert!(validate_lon_lat(-74.0060, 40.7128).is_ok());
/// assert!(validate_lon_lat(200.0, 40.0).is_err());
/// assert!(validate_lon_lat(-74.0, 95.0).is_err());
/// ```
pub fn validate_lon_lat(lon: f64, lat: f64) -> Result<()> {
    let in_range = lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat);

    if in_range {
        Ok(())
    } else {
        Err(GeoscanError::InvalidCoordinate { lon, lat })
    }
}

/// Validates a geohash character precision.
pub fn validate_precision(precision: usize) -> Result<()> {
    if (MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        Ok(())
    } else {
        Err(GeoscanError::InvalidPrecision(precision))
    }
}

/// Validates the neighbor count of a KNN query.
pub fn validate_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(GeoscanError::InvalidInput(
            "k must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
