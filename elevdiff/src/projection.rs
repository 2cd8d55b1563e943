//! Destination projection from an origin, a bearing and a distance.
//!
//! The projection uses a flat-Earth small-angle approximation on a sphere of
//! radius [`EARTH_RADIUS_M`]:
//!
//! ```text
//! dLat = d · cos(θ) / R
//! dLon = d · sin(θ) / (R · cos(φ₀))
//! ```
//!
//! where `θ` is the bearing clockwise from true north and `φ₀` the origin
//! latitude. It is accurate for the short segments this crate deals with and
//! degrades towards the poles, where `cos(φ₀)` approaches zero and the
//! longitude delta blows up. Results are not wrapped back into the canonical
//! `[-90, 90]` / `[-180, 180]` ranges.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic position in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Project the point reached by travelling `distance_m` meters from `origin`
/// along `bearing_deg` (degrees clockwise from true north).
///
/// # Examples
///
/// ```
/// use elevdiff::projection::{project, Coordinate};
///
/// let dest = project(Coordinate::new(41.2995, 69.2401), 0.0, 1000.0);
/// assert!(dest.lat > 41.2995);
/// assert_eq!(dest.lon, 69.2401);
/// ```
pub fn project(origin: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let bearing = bearing_deg.to_radians();
    let d_lat = distance_m * bearing.cos() / EARTH_RADIUS_M;
    let d_lon = distance_m * bearing.sin() / (EARTH_RADIUS_M * origin.lat.to_radians().cos());

    Coordinate {
        lat: origin.lat + d_lat.to_degrees(),
        lon: origin.lon + d_lon.to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_one_radian_due_east() {
        let dest = project(Coordinate::new(0.0, 0.0), 90.0, EARTH_RADIUS_M * 1f64.to_radians());
        assert!((dest.lon - 1.0).abs() < EPS, "lon = {}", dest.lon);
        assert!(dest.lat.abs() < EPS, "lat = {}", dest.lat);
    }

    #[test]
    fn test_due_north_and_south() {
        let arc = EARTH_RADIUS_M * 0.5f64.to_radians();

        let north = project(Coordinate::new(10.0, 20.0), 0.0, arc);
        assert!((north.lat - 10.5).abs() < EPS);
        assert!((north.lon - 20.0).abs() < EPS);

        let south = project(Coordinate::new(10.0, 20.0), 180.0, arc);
        assert!((south.lat - 9.5).abs() < EPS);
        assert!((south.lon - 20.0).abs() < EPS);
    }

    #[test]
    fn test_bearing_360_matches_0() {
        let origin = Coordinate::new(41.2995, 69.2401);
        let a = project(origin, 0.0, 1000.0);
        let b = project(origin, 360.0, 1000.0);
        assert!((a.lat - b.lat).abs() < EPS);
        assert!((a.lon - b.lon).abs() < EPS);
    }

    #[test]
    fn test_zero_distance_is_identity() {
        let origin = Coordinate::new(-33.9, 151.2);
        assert_eq!(project(origin, 123.0, 0.0), origin);
    }

    #[test]
    fn test_longitude_delta_widens_with_latitude() {
        let at_equator = project(Coordinate::new(0.0, 0.0), 90.0, 10_000.0);
        let at_sixty = project(Coordinate::new(60.0, 0.0), 90.0, 10_000.0);
        // cos(60°) = 0.5, so the same distance spans twice the longitude.
        assert!((at_sixty.lon - 2.0 * at_equator.lon).abs() < 1e-6);
    }

    #[test]
    fn test_no_normalization_across_antimeridian() {
        let dest = project(Coordinate::new(0.0, 179.99), 90.0, 10_000.0);
        assert!(dest.lon > 180.0);
    }

    #[test]
    fn test_pole_degenerates_without_panicking() {
        let dest = project(Coordinate::new(90.0, 0.0), 90.0, 1000.0);
        // cos(90°) is ~6e-17, so the longitude delta is huge (or non-finite).
        assert!(dest.lon.abs() > 1e6 || !dest.lon.is_finite());
    }
}
