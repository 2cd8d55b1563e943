//! Error types for the elevdiff library.

use std::fmt;

use thiserror::Error;

use crate::projection::Coordinate;

/// A numeric field of a segment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Latitude,
    Longitude,
    Bearing,
    Distance,
}

impl Field {
    /// Human-readable field name, as used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::Bearing => "bearing",
            Field::Distance => "distance",
        }
    }

    /// The accepted range, for error messages.
    pub fn bounds(&self) -> &'static str {
        match self {
            Field::Latitude => "-90 to 90",
            Field::Longitude => "-180 to 180",
            Field::Bearing => "0 to 360",
            Field::Distance => ">= 0",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which end of a segment an elevation sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Origin,
    Destination,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Origin => f.write_str("origin"),
            Endpoint::Destination => f.write_str("destination"),
        }
    }
}

/// Why an elevation sample is absent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    /// The provider could not be reached within the retry budget.
    #[error("elevation provider unreachable for ({}, {}) after {attempts} attempt(s): {reason}", .coordinate.lat, .coordinate.lon)]
    Unreachable {
        coordinate: Coordinate,
        attempts: u32,
        reason: String,
    },

    /// The provider answered, but the payload held no usable elevation.
    #[error("malformed elevation response for ({}, {}): {reason}", .coordinate.lat, .coordinate.lon)]
    MalformedResponse { coordinate: Coordinate, reason: String },
}

impl LookupError {
    /// The coordinate that was being looked up.
    pub fn coordinate(&self) -> Coordinate {
        match self {
            LookupError::Unreachable { coordinate, .. }
            | LookupError::MalformedResponse { coordinate, .. } => *coordinate,
        }
    }
}

/// Row-level failure kinds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentError {
    /// Wrong field count or a non-numeric field.
    #[error("malformed row: {reason}")]
    MalformedRow { reason: String },

    /// A field violates its declared bound.
    #[error("{field} out of range: {value} (expected {})", .field.bounds())]
    OutOfRange { field: Field, value: f64 },

    /// The elevation of one endpoint could not be obtained.
    #[error("missing elevation for {endpoint} point: {source}")]
    MissingElevation {
        endpoint: Endpoint,
        #[source]
        source: LookupError,
    },
}

impl SegmentError {
    /// Short machine-readable name of the error kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SegmentError::MalformedRow { .. } => "malformed_row",
            SegmentError::OutOfRange { .. } => "out_of_range",
            SegmentError::MissingElevation { .. } => "missing_elevation",
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        SegmentError::MalformedRow {
            reason: reason.into(),
        }
    }
}

/// A batch failure: the 1-based row number and what went wrong there.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("row {row}: {kind}")]
pub struct BatchError {
    /// 1-based position of the failing row in the input.
    pub row: usize,
    /// The failure kind.
    #[source]
    pub kind: SegmentError,
}

/// Errors raised while setting up the engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The HTTP client could not be built.
    #[cfg(feature = "http")]
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
