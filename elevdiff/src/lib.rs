//! # elevdiff - Terrain Elevation Differentials
//!
//! Computes the signed elevation differential between the start and the
//! projected end of straight-line segments, each described by an origin
//! coordinate, a compass bearing and a distance.
//!
//! ## Features
//!
//! - **Projection**: flat-Earth small-angle destination projection
//! - **Resilient lookups**: bounded, per-client retry against any elevation source
//! - **Ordered batches**: fail-fast by default, collect-all on request
//! - **HTTP providers** (`http` feature): Open-Elevation, Google Maps, custom URL templates
//!
//! ## Quick Start
//!
//! ```ignore
//! use elevdiff::{BatchProcessor, ElevationClient, RetryPolicy};
//! use elevdiff::http::{HttpElevationSource, ProviderApi};
//! use std::time::Duration;
//!
//! let source = HttpElevationSource::new(ProviderApi::OpenElevation, Duration::from_secs(30))?;
//! let processor = BatchProcessor::new(ElevationClient::new(source));
//!
//! for d in processor.process_batch(["41.2995 69.2401 45 1000"])? {
//!     println!("Elevation difference: {} m", d);
//! }
//! ```
//!
//! ## Sign Convention
//!
//! A segment that climbs from start to end yields a **negative** differential,
//! one that descends yields a **positive** differential:
//!
//! | Start | End | Differential |
//! |-------|-----|--------------|
//! | 100 m | 150 m | -50.00 |
//! | 150 m | 100 m | 50.00 |

pub mod batch;
pub mod config;
pub mod differential;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod projection;
pub mod provider;
pub mod segment;

// Re-export main types at crate root for convenience
pub use batch::{BatchPolicy, BatchProcessor, BatchReport, BatchResult};
pub use config::EngineConfig;
pub use differential::{compute_differential, Differential};
pub use error::{BatchError, Endpoint, Error, Field, LookupError, Result, SegmentError};
pub use projection::{project, Coordinate, EARTH_RADIUS_M};
pub use provider::{ElevationClient, ElevationSample, ElevationSource, RetryPolicy, SourceError};
pub use segment::{RowFormat, SegmentRequest};
