//! Segment requests and row parsing.
//!
//! A segment is described by four numbers: origin latitude, origin longitude,
//! bearing and distance. Rows arrive as text in one of two dialects:
//!
//! - [`RowFormat::Whitespace`]: `41.2995 69.2401 45 1000`
//! - [`RowFormat::Semicolon`]: `40.53648 70.94076;120;1000`

use std::str::FromStr;

use crate::error::{Field, SegmentError};
use crate::projection::Coordinate;

/// Textual layout of a segment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowFormat {
    /// Four whitespace-separated numbers.
    #[default]
    Whitespace,
    /// `lat lon;bearing;distance`.
    Semicolon,
}

impl FromStr for RowFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "whitespace" | "space" => Ok(RowFormat::Whitespace),
            "semicolon" | "spreadsheet" => Ok(RowFormat::Semicolon),
            other => Err(format!(
                "unknown row format '{}' (expected 'whitespace' or 'semicolon')",
                other
            )),
        }
    }
}

/// A validated request to measure one segment.
///
/// Construction goes through [`SegmentRequest::new`], so every value of this
/// type satisfies the range invariants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRequest {
    origin: Coordinate,
    bearing_deg: f64,
    distance_m: f64,
}

impl SegmentRequest {
    /// Validate and build a segment request.
    ///
    /// Fields are checked in order latitude, longitude, bearing, distance;
    /// the first violation is reported. NaN fails every check.
    pub fn new(
        origin_lat: f64,
        origin_lon: f64,
        bearing_deg: f64,
        distance_m: f64,
    ) -> Result<Self, SegmentError> {
        check(Field::Latitude, origin_lat, (-90.0..=90.0).contains(&origin_lat))?;
        check(Field::Longitude, origin_lon, (-180.0..=180.0).contains(&origin_lon))?;
        check(Field::Bearing, bearing_deg, (0.0..=360.0).contains(&bearing_deg))?;
        check(Field::Distance, distance_m, distance_m >= 0.0)?;

        Ok(Self {
            origin: Coordinate::new(origin_lat, origin_lon),
            bearing_deg,
            distance_m,
        })
    }

    /// Parse and validate a row in the given format.
    ///
    /// # Examples
    ///
    /// ```
    /// use elevdiff::segment::{RowFormat, SegmentRequest};
    ///
    /// let a = SegmentRequest::parse("41.2995 69.2401 45 1000", RowFormat::Whitespace).unwrap();
    /// let b = SegmentRequest::parse("41.2995 69.2401;45;1000", RowFormat::Semicolon).unwrap();
    /// assert_eq!(a, b);
    /// ```
    pub fn parse(row: &str, format: RowFormat) -> Result<Self, SegmentError> {
        let [lat, lon, bearing, distance] = match format {
            RowFormat::Whitespace => split_whitespace_row(row)?,
            RowFormat::Semicolon => split_semicolon_row(row)?,
        };

        Self::new(
            parse_number(Field::Latitude, lat)?,
            parse_number(Field::Longitude, lon)?,
            parse_number(Field::Bearing, bearing)?,
            parse_number(Field::Distance, distance)?,
        )
    }

    /// Origin of the segment.
    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    /// Bearing in degrees clockwise from true north.
    pub fn bearing_deg(&self) -> f64 {
        self.bearing_deg
    }

    /// Length of the segment in meters.
    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }
}

fn check(field: Field, value: f64, ok: bool) -> Result<(), SegmentError> {
    if ok {
        Ok(())
    } else {
        Err(SegmentError::OutOfRange { field, value })
    }
}

fn parse_number(field: Field, raw: &str) -> Result<f64, SegmentError> {
    raw.parse::<f64>()
        .map_err(|_| SegmentError::malformed(format!("{} is not a number: '{}'", field, raw)))
}

fn split_whitespace_row(row: &str) -> Result<[&str; 4], SegmentError> {
    let parts: Vec<&str> = row.split_whitespace().collect();
    <[&str; 4]>::try_from(parts.as_slice()).map_err(|_| {
        SegmentError::malformed(format!(
            "expected 4 fields (latitude longitude bearing distance), found {}",
            parts.len()
        ))
    })
}

fn split_semicolon_row(row: &str) -> Result<[&str; 4], SegmentError> {
    let parts: Vec<&str> = row.trim().split(';').map(str::trim).collect();
    let [coords, bearing, distance] = <[&str; 3]>::try_from(parts.as_slice()).map_err(|_| {
        SegmentError::malformed(format!(
            "expected 3 ';'-separated parts (coordinates;bearing;distance), found {}",
            parts.len()
        ))
    })?;

    let coords: Vec<&str> = coords.split_whitespace().collect();
    let [lat, lon] = <[&str; 2]>::try_from(coords.as_slice()).map_err(|_| {
        SegmentError::malformed(format!(
            "expected latitude and longitude separated by a space, found {} value(s)",
            coords.len()
        ))
    })?;

    Ok([lat, lon, bearing, distance])
}
