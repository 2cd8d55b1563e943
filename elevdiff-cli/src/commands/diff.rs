use anyhow::{bail, Context, Result};
use elevdiff::{BatchPolicy, BatchProcessor, Differential, ElevationSource};
use serde::Serialize;
use std::io::{self, BufRead, Write};

#[derive(Serialize)]
struct RowOutput {
    row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    value_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RowOutput {
    fn ok(row: usize, d: Differential) -> Self {
        Self {
            row,
            value_m: Some(d.value_m),
            display: Some(d.to_string()),
            error: None,
        }
    }

    fn failed(row: usize, error: String) -> Self {
        Self {
            row,
            value_m: None,
            display: None,
            error: Some(error),
        }
    }
}

pub fn run<S: ElevationSource>(
    processor: &BatchProcessor<S>,
    policy: BatchPolicy,
    rows: Vec<String>,
    json: bool,
) -> Result<()> {
    let rows = if rows.is_empty() {
        read_rows(io::stdin().lock())?
    } else {
        rows
    };

    let mut out = io::stdout().lock();
    render(processor, policy, &rows, json, &mut out)
}

/// Non-blank lines of the reader, trimmed.
fn read_rows<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read rows from stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            rows.push(line.to_string());
        }
    }
    Ok(rows)
}

fn render<S: ElevationSource, W: Write>(
    processor: &BatchProcessor<S>,
    policy: BatchPolicy,
    rows: &[String],
    json: bool,
    out: &mut W,
) -> Result<()> {
    match policy {
        BatchPolicy::FailFast => {
            let differentials = processor
                .process_batch(rows)
                .context("Batch aborted, no differentials reported")?;

            if json {
                let output: Vec<RowOutput> = differentials
                    .into_iter()
                    .enumerate()
                    .map(|(i, d)| RowOutput::ok(i + 1, d))
                    .collect();
                serde_json::to_writer(
                    &mut *out,
                    &serde_json::json!({ "differentials": output }),
                )?;
                writeln!(out)?;
            } else {
                for d in differentials {
                    writeln!(out, "Elevation difference: {} m", d)?;
                }
            }
        }
        BatchPolicy::CollectAll => {
            let report = processor.process_batch_collect(rows);
            let failed = report.failed();
            let total = report.rows.len();

            if json {
                let output: Vec<RowOutput> = report
                    .rows
                    .into_iter()
                    .enumerate()
                    .map(|(i, r)| match r {
                        Ok(d) => RowOutput::ok(i + 1, d),
                        Err(e) => RowOutput::failed(i + 1, e.kind.to_string()),
                    })
                    .collect();
                serde_json::to_writer(&mut *out, &serde_json::json!({ "results": output }))?;
                writeln!(out)?;
            } else {
                for result in report.rows {
                    match result {
                        Ok(d) => writeln!(out, "Elevation difference: {} m", d)?,
                        Err(e) => writeln!(out, "Row {}: error: {}", e.row, e.kind)?,
                    }
                }
            }

            if failed > 0 {
                bail!("{} of {} rows failed", failed, total);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elevdiff::{Coordinate, ElevationClient, RetryPolicy, SourceError};
    use std::io::Cursor;
    use std::time::Duration;

    /// Elevation rises 1 m per 0.001° of latitude.
    struct SlopeSource;

    impl ElevationSource for SlopeSource {
        fn lookup(&self, c: Coordinate) -> std::result::Result<f64, SourceError> {
            Ok(c.lat * 1000.0)
        }
    }

    fn processor() -> BatchProcessor<SlopeSource> {
        let retry = RetryPolicy::default().with_delay(Duration::ZERO);
        BatchProcessor::new(ElevationClient::with_retry(SlopeSource, retry))
    }

    fn rows(rows: &[&str]) -> Vec<String> {
        rows.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_read_rows_skips_blank_lines() {
        let input = Cursor::new("41.2995 69.2401 45 1000\n\n  \n41.2995 69.2401 45 1000  \n");
        let rows = read_rows(input).unwrap();
        assert_eq!(rows, vec!["41.2995 69.2401 45 1000"; 2]);
    }

    #[test]
    fn test_render_text() {
        let mut out = Vec::new();
        render(
            &processor(),
            BatchPolicy::FailFast,
            &rows(&["10 20 180 1000", "10 20 90 1000"]),
            false,
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Elevation difference: 8.99 m");
        assert_eq!(lines[1], "Elevation difference: 0.00 m");
    }

    #[test]
    fn test_render_fail_fast_writes_nothing() {
        let mut out = Vec::new();
        let err = render(
            &processor(),
            BatchPolicy::FailFast,
            &rows(&["10 20 180 1000", "10 20 400 1000"]),
            false,
            &mut out,
        )
        .unwrap_err();

        assert!(out.is_empty());
        assert!(format!("{:#}", err).contains("row 2"));
    }

    #[test]
    fn test_render_collect_all_json() {
        let mut out = Vec::new();
        let result = render(
            &processor(),
            BatchPolicy::CollectAll,
            &rows(&["bad", "10 20 180 1000"]),
            true,
            &mut out,
        );
        assert!(result.is_err());

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["row"], 1);
        assert!(results[0]["error"].as_str().unwrap().contains("malformed"));
        assert_eq!(results[1]["display"], "8.99");
    }
}
