//! Ordered batch processing of segment rows.
//!
//! Each row goes through the same pipeline, strictly in input order:
//!
//! 1. parse into four numbers ([`SegmentError::MalformedRow`])
//! 2. validate ranges ([`SegmentError::OutOfRange`])
//! 3. project the destination
//! 4. look up the origin elevation, then the destination elevation
//! 5. combine both into a signed [`Differential`]
//!    ([`SegmentError::MissingElevation`] if either lookup came back empty)
//!
//! [`BatchProcessor::process_batch`] is fail-fast: the first failing row
//! aborts the batch and no differentials are returned.
//! [`BatchProcessor::process_batch_collect`] attempts every row and reports
//! each outcome separately.

use std::str::FromStr;

use crate::differential::{compute_differential, Differential};
use crate::error::{BatchError, SegmentError};
use crate::projection::project;
use crate::provider::{ElevationClient, ElevationSource};
use crate::segment::{RowFormat, SegmentRequest};

/// Ordered differentials, or the single error that aborted the batch.
pub type BatchResult = Result<Vec<Differential>, BatchError>;

/// How a batch reacts to a failing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// Abort on the first failing row.
    #[default]
    FailFast,
    /// Attempt every row and report per-row outcomes.
    CollectAll,
}

impl FromStr for BatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail-fast" | "fail_fast" | "failfast" => Ok(BatchPolicy::FailFast),
            "collect-all" | "collect_all" | "collectall" => Ok(BatchPolicy::CollectAll),
            other => Err(format!(
                "unknown batch policy '{}' (expected 'fail-fast' or 'collect-all')",
                other
            )),
        }
    }
}

/// Per-row outcomes of a collect-all batch, in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchReport {
    /// One entry per input row.
    pub rows: Vec<Result<Differential, BatchError>>,
}

impl BatchReport {
    /// Number of rows that produced a differential.
    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|r| r.is_ok()).count()
    }

    /// Number of rows that failed.
    pub fn failed(&self) -> usize {
        self.rows.len() - self.succeeded()
    }

    /// The failures, in input order.
    pub fn errors(&self) -> impl Iterator<Item = &BatchError> {
        self.rows.iter().filter_map(|r| r.as_ref().err())
    }

    /// Convert into fail-fast form: all differentials, or the first error.
    pub fn into_result(self) -> BatchResult {
        self.rows.into_iter().collect()
    }
}

/// Runs segment rows through projection, elevation lookup and differential.
///
/// # Example
///
/// ```ignore
/// use elevdiff::{BatchProcessor, ElevationClient};
///
/// let processor = BatchProcessor::new(ElevationClient::new(source));
/// let differentials = processor.process_batch(["41.2995 69.2401 45 1000"])?;
/// println!("Elevation difference: {} m", differentials[0]);
/// ```
#[derive(Debug, Clone)]
pub struct BatchProcessor<S> {
    client: ElevationClient<S>,
    format: RowFormat,
}

impl<S: ElevationSource> BatchProcessor<S> {
    /// Create a processor reading [`RowFormat::Whitespace`] rows.
    pub fn new(client: ElevationClient<S>) -> Self {
        Self {
            client,
            format: RowFormat::default(),
        }
    }

    /// Set the row format.
    pub fn with_format(mut self, format: RowFormat) -> Self {
        self.format = format;
        self
    }

    /// The row format in use.
    pub fn format(&self) -> RowFormat {
        self.format
    }

    /// The elevation client in use.
    pub fn client(&self) -> &ElevationClient<S> {
        &self.client
    }

    /// Process rows fail-fast.
    ///
    /// Returns one differential per row, in input order, or the error of the
    /// first failing row (1-based row number). Rows after the failing one are
    /// not looked at.
    pub fn process_batch<I>(&self, rows: I) -> BatchResult
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut differentials = Vec::new();
        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            match self.process_row(row.as_ref()) {
                Ok(d) => differentials.push(d),
                Err(kind) => return Err(self.abort(row_number, kind, differentials.len())),
            }
        }

        tracing::info!(rows = differentials.len(), "Batch complete");
        Ok(differentials)
    }

    /// Process rows collect-all: every row is attempted.
    pub fn process_batch_collect<I>(&self, rows: I) -> BatchReport
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let rows: Vec<_> = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                self.process_row(row.as_ref()).map_err(|kind| {
                    tracing::warn!(row = index + 1, error = %kind, "Row failed");
                    BatchError {
                        row: index + 1,
                        kind,
                    }
                })
            })
            .collect();

        let report = BatchReport { rows };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch complete"
        );
        report
    }

    /// Process already validated requests fail-fast.
    pub fn process_requests(&self, requests: &[SegmentRequest]) -> BatchResult {
        let mut differentials = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            match self.measure(request) {
                Ok(d) => differentials.push(d),
                Err(kind) => return Err(self.abort(index + 1, kind, differentials.len())),
            }
        }

        tracing::info!(rows = differentials.len(), "Batch complete");
        Ok(differentials)
    }

    /// Parse, validate and measure a single row.
    pub fn process_row(&self, row: &str) -> Result<Differential, SegmentError> {
        let request = SegmentRequest::parse(row, self.format)?;
        self.measure(&request)
    }

    /// Measure one validated segment: project, look up both ends, combine.
    pub fn measure(&self, request: &SegmentRequest) -> Result<Differential, SegmentError> {
        let origin = request.origin();
        let destination = project(origin, request.bearing_deg(), request.distance_m());

        let start = self.client.fetch_elevation(origin);
        let end = self.client.fetch_elevation(destination);
        let differential = compute_differential(start, end)?;

        tracing::debug!(
            lat = origin.lat,
            lon = origin.lon,
            bearing_deg = request.bearing_deg(),
            distance_m = request.distance_m(),
            dest_lat = destination.lat,
            dest_lon = destination.lon,
            value_m = differential.value_m,
            "Segment measured"
        );
        Ok(differential)
    }

    fn abort(&self, row: usize, kind: SegmentError, discarded: usize) -> BatchError {
        tracing::warn!(row, discarded, error = %kind, "Batch aborted");
        BatchError { row, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Endpoint, Field, LookupError};
    use crate::projection::Coordinate;
    use crate::provider::tests::ScriptedSource;
    use crate::provider::{RetryPolicy, SourceError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Elevation grows by 1 m per 0.001° of latitude; records every lookup.
    struct SlopeSource {
        lookups: Mutex<Vec<Coordinate>>,
        calls: AtomicUsize,
    }

    impl SlopeSource {
        fn new() -> Self {
            Self {
                lookups: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ElevationSource for SlopeSource {
        fn lookup(&self, coordinate: Coordinate) -> Result<f64, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.lookups.lock().unwrap().push(coordinate);
            Ok(coordinate.lat * 1000.0)
        }
    }

    fn processor<S: ElevationSource>(source: S) -> BatchProcessor<S> {
        let retry = RetryPolicy::default().with_delay(Duration::ZERO);
        BatchProcessor::new(ElevationClient::with_retry(source, retry))
    }

    #[test]
    fn test_order_preservation() {
        let p = processor(SlopeSource::new());
        // Due north climbs, due south descends, east stays flat.
        let rows = [
            "10 20 0 1000",
            "10 20 180 1000",
            "10 20 90 1000",
            "10 20 0 2000",
        ];

        let result = p.process_batch(rows).unwrap();
        assert_eq!(result.len(), 4);
        assert!(result[0].value_m < 0.0);
        assert!(result[1].value_m > 0.0);
        assert!(result[2].value_m.abs() < 1e-9);
        assert!((result[3].value_m - 2.0 * result[0].value_m).abs() < 1e-6);
    }

    #[test]
    fn test_origin_looked_up_before_destination() {
        let p = processor(SlopeSource::new());
        p.process_batch(["10 20 0 1000"]).unwrap();

        let lookups = p.client().source().lookups.lock().unwrap();
        assert_eq!(lookups.len(), 2);
        assert_eq!(lookups[0], Coordinate::new(10.0, 20.0));
        assert!(lookups[1].lat > 10.0);
    }

    #[test]
    fn test_fail_fast_on_malformed_row() {
        let p = processor(SlopeSource::new());
        let rows = ["10 20 0 1000", "10 20 0", "10 20 90 1000"];

        let err = p.process_batch(rows).unwrap_err();
        assert_eq!(err.row, 2);
        assert!(matches!(err.kind, SegmentError::MalformedRow { .. }));
        // Row 1 was measured, row 3 never touched.
        assert_eq!(p.client().source().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_out_of_range_does_not_call_provider() {
        let cases = [
            ("91 0 0 10", Field::Latitude),
            ("-90.5 0 0 10", Field::Latitude),
            ("0 181 0 10", Field::Longitude),
            ("0 -180.01 0 10", Field::Longitude),
            ("0 0 361 10", Field::Bearing),
            ("0 0 -0.5 10", Field::Bearing),
            ("0 0 0 -1", Field::Distance),
        ];

        for (row, expected) in cases {
            let p = processor(SlopeSource::new());
            let err = p.process_batch([row]).unwrap_err();
            assert_eq!(err.row, 1);
            match err.kind {
                SegmentError::OutOfRange { field, .. } => assert_eq!(field, expected, "{row}"),
                other => panic!("expected OutOfRange for {row}, got {:?}", other),
            }
            assert_eq!(p.client().source().calls.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn test_retry_exhaustion_surfaces_missing_elevation() {
        let source = ScriptedSource::always(Err(SourceError::Transport("timeout".into())));
        let p = processor(source);

        let err = p.process_batch(["41.2995 69.2401 45 1000"]).unwrap_err();
        assert_eq!(err.row, 1);
        match err.kind {
            SegmentError::MissingElevation {
                endpoint: Endpoint::Origin,
                source: LookupError::Unreachable { attempts, .. },
            } => assert_eq!(attempts, 3),
            other => panic!("expected MissingElevation, got {:?}", other),
        }
        // Three attempts for the origin, three for the destination.
        assert_eq!(p.client().source().calls(), 6);
    }

    #[test]
    fn test_transient_failures_recover() {
        let transport = || Err(SourceError::Transport("HTTP 502".into()));
        let source = ScriptedSource::new([transport(), transport(), Ok(100.0)], Ok(150.0));
        let p = processor(source);

        let result = p.process_batch(["41.2995 69.2401 45 1000"]).unwrap();
        assert_eq!(result, vec![Differential { value_m: -50.0 }]);
    }

    #[test]
    fn test_empty_batch() {
        let p = processor(SlopeSource::new());
        let rows: Vec<String> = Vec::new();
        assert_eq!(p.process_batch(rows).unwrap(), Vec::new());
        assert!(p.process_batch_collect(Vec::<String>::new()).rows.is_empty());
    }

    #[test]
    fn test_semicolon_format() {
        let p = processor(SlopeSource::new()).with_format(RowFormat::Semicolon);
        let result = p.process_batch(["40.53648 70.94076;180;1000"]).unwrap();
        assert!(result[0].value_m > 0.0);

        let err = p.process_batch(["40.53648 70.94076 180 1000"]).unwrap_err();
        assert!(matches!(err.kind, SegmentError::MalformedRow { .. }));
    }

    #[test]
    fn test_collect_all_reports_every_row() {
        let p = processor(SlopeSource::new());
        let rows = ["10 20 0 1000", "oops", "95 0 0 1", "10 20 180 1000"];

        let report = p.process_batch_collect(rows);
        assert_eq!(report.rows.len(), 4);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 2);

        let failed_rows: Vec<usize> = report.errors().map(|e| e.row).collect();
        assert_eq!(failed_rows, vec![2, 3]);
        assert!(report.rows[3].is_ok());

        let first = report.into_result().unwrap_err();
        assert_eq!(first.row, 2);
    }

    #[test]
    fn test_process_requests() {
        let p = processor(SlopeSource::new());
        let requests = [
            SegmentRequest::new(10.0, 20.0, 0.0, 1000.0).unwrap(),
            SegmentRequest::new(10.0, 20.0, 180.0, 1000.0).unwrap(),
        ];
        let result = p.process_requests(&requests).unwrap();
        assert_eq!(result.len(), 2);
        assert!((result[0].value_m + result[1].value_m).abs() < 1e-6);
    }

    #[test]
    fn test_batch_policy_from_str() {
        assert_eq!("fail-fast".parse::<BatchPolicy>(), Ok(BatchPolicy::FailFast));
        assert_eq!("Collect-All".parse::<BatchPolicy>(), Ok(BatchPolicy::CollectAll));
        assert!("best-effort".parse::<BatchPolicy>().is_err());
        assert_eq!(BatchPolicy::default(), BatchPolicy::FailFast);
    }
}
