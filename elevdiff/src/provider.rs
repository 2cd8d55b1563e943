//! Elevation lookups with bounded retry.
//!
//! [`ElevationSource`] is the single-attempt boundary to whatever actually
//! knows the terrain height (a remote API, a test stub, ...).
//! [`ElevationClient`] wraps a source with a [`RetryPolicy`]:
//!
//! - transport failures are retried up to `max_attempts` times in total, with
//!   a fixed pause of `delay` between attempts;
//! - a malformed payload is reported immediately, without retrying.
//!
//! The pause only blocks the calling thread. The policy belongs to the client
//! instance, so independent clients (or independent batches sharing one
//! client) never wait on each other.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::error::LookupError;
use crate::projection::Coordinate;

/// Default number of attempts per lookup.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Failure of a single lookup attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Network error or non-success response. Worth retrying.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be interpreted as an elevation. Not retried.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// A single-attempt elevation lookup.
pub trait ElevationSource: Send + Sync {
    /// Return the ground elevation in meters at `coordinate`.
    fn lookup(&self, coordinate: Coordinate) -> Result<f64, SourceError>;
}

impl<S: ElevationSource + ?Sized> ElevationSource for Arc<S> {
    fn lookup(&self, coordinate: Coordinate) -> Result<f64, SourceError> {
        (**self).lookup(coordinate)
    }
}

impl<S: ElevationSource + ?Sized> ElevationSource for Box<S> {
    fn lookup(&self, coordinate: Coordinate) -> Result<f64, SourceError> {
        (**self).lookup(coordinate)
    }
}

/// Ground elevation at a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationSample {
    /// Where the elevation was sampled.
    pub coordinate: Coordinate,
    /// Elevation in meters.
    pub elevation_m: f64,
}

/// Retry budget and pause for an [`ElevationClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given budget and delay.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the pause between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Elevation lookups through an [`ElevationSource`] with bounded retry.
#[derive(Debug, Clone)]
pub struct ElevationClient<S> {
    source: S,
    retry: RetryPolicy,
}

impl<S: ElevationSource> ElevationClient<S> {
    /// Create a client with the default retry policy (3 attempts, 2 s apart).
    pub fn new(source: S) -> Self {
        Self::with_retry(source, RetryPolicy::default())
    }

    /// Create a client with an explicit retry policy.
    pub fn with_retry(source: S, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// The retry policy in use.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the elevation at `coordinate`.
    ///
    /// # Returns
    ///
    /// - `Ok(sample)` on the first successful attempt
    /// - `Err(LookupError::Unreachable)` once the retry budget is spent
    /// - `Err(LookupError::MalformedResponse)` as soon as a payload cannot be
    ///   interpreted
    pub fn fetch_elevation(&self, coordinate: Coordinate) -> Result<ElevationSample, LookupError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.source.lookup(coordinate) {
                Ok(elevation_m) => {
                    tracing::debug!(
                        lat = coordinate.lat,
                        lon = coordinate.lon,
                        attempt,
                        elevation_m,
                        "Elevation lookup succeeded"
                    );
                    return Ok(ElevationSample {
                        coordinate,
                        elevation_m,
                    });
                }
                Err(SourceError::Malformed(reason)) => {
                    tracing::warn!(
                        lat = coordinate.lat,
                        lon = coordinate.lon,
                        attempt,
                        reason = %reason,
                        "Malformed elevation response"
                    );
                    return Err(LookupError::MalformedResponse { coordinate, reason });
                }
                Err(SourceError::Transport(reason)) => {
                    if attempt == max_attempts {
                        tracing::error!(
                            lat = coordinate.lat,
                            lon = coordinate.lon,
                            attempts = max_attempts,
                            reason = %reason,
                            "Elevation provider unreachable, giving up"
                        );
                        return Err(LookupError::Unreachable {
                            coordinate,
                            attempts: max_attempts,
                            reason,
                        });
                    }

                    tracing::warn!(
                        lat = coordinate.lat,
                        lon = coordinate.lon,
                        attempt,
                        max_attempts,
                        reason = %reason,
                        "Elevation lookup failed, retrying"
                    );
                    if !self.retry.delay.is_zero() {
                        std::thread::sleep(self.retry.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
