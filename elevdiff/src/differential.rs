//! Signed elevation differential between two samples.

use std::fmt;

use crate::error::{Endpoint, LookupError, SegmentError};
use crate::provider::ElevationSample;

/// Signed elevation differential in meters.
///
/// Sign convention: a segment that climbs from start to end is reported as a
/// *negative* value, one that descends as a *positive* value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Differential {
    /// Signed differential in meters.
    pub value_m: f64,
}

impl fmt::Display for Differential {
    /// Two decimals, e.g. `-50.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.value_m)
    }
}

/// Combine the start and end samples of a segment into a [`Differential`].
///
/// Either sample may be absent (the `Err` arm of a lookup), in which case the
/// result is [`SegmentError::MissingElevation`] naming that endpoint. The start
/// sample is checked first.
///
/// # Examples
///
/// ```
/// use elevdiff::differential::compute_differential;
/// use elevdiff::provider::ElevationSample;
/// use elevdiff::projection::Coordinate;
///
/// let at = |elevation_m| Ok(ElevationSample { coordinate: Coordinate::default(), elevation_m });
/// assert_eq!(compute_differential(at(100.0), at(150.0)).unwrap().value_m, -50.0);
/// assert_eq!(compute_differential(at(150.0), at(100.0)).unwrap().value_m, 50.0);
/// ```
pub fn compute_differential(
    start: Result<ElevationSample, LookupError>,
    end: Result<ElevationSample, LookupError>,
) -> Result<Differential, SegmentError> {
    let start = start.map_err(|source| SegmentError::MissingElevation {
        endpoint: Endpoint::Origin,
        source,
    })?;
    let end = end.map_err(|source| SegmentError::MissingElevation {
        endpoint: Endpoint::Destination,
        source,
    })?;

    Ok(signed_differential(start.elevation_m, end.elevation_m))
}

/// Apply the sign convention to a pair of raw elevations.
pub fn signed_differential(start_m: f64, end_m: f64) -> Differential {
    let raw = end_m - start_m;
    let value_m = if raw > 0.0 { -raw.abs() } else { raw.abs() };
    Differential { value_m }
}
