use anyhow::{Context, Result};
use csv::StringRecord;
use elevdiff::{BatchPolicy, BatchProcessor, ElevationSource, RowFormat};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Name of the column appended to every record.
const OUTPUT_COLUMN: &str = "elevation_difference";

/// Where the segment fields live in the CSV.
pub enum Columns {
    /// Four separate numeric columns.
    Separate {
        lat: String,
        lon: String,
        bearing: String,
        distance: String,
    },
    /// One column holding `lat lon;bearing;distance`.
    Combined(String),
}

enum ColumnIndices {
    Separate([usize; 4]),
    Combined(usize),
}

impl Columns {
    fn resolve(&self, headers: &StringRecord) -> Result<ColumnIndices> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .with_context(|| format!("Column '{}' not found in CSV", name))
        };

        Ok(match self {
            Columns::Separate {
                lat,
                lon,
                bearing,
                distance,
            } => ColumnIndices::Separate([find(lat)?, find(lon)?, find(bearing)?, find(distance)?]),
            Columns::Combined(name) => ColumnIndices::Combined(find(name)?),
        })
    }

    fn format(&self) -> RowFormat {
        match self {
            Columns::Separate { .. } => RowFormat::Whitespace,
            Columns::Combined(_) => RowFormat::Semicolon,
        }
    }
}

impl ColumnIndices {
    /// Assemble the segment row for a record in the matching row format.
    fn row(&self, record: &StringRecord) -> String {
        match self {
            ColumnIndices::Separate(indices) => indices
                .iter()
                .map(|&i| record.get(i).unwrap_or("").trim())
                .collect::<Vec<_>>()
                .join(" "),
            ColumnIndices::Combined(i) => record.get(*i).unwrap_or("").trim().to_string(),
        }
    }
}

pub fn run<S: ElevationSource + Clone>(
    processor: &BatchProcessor<S>,
    policy: BatchPolicy,
    input: &Path,
    output: Option<PathBuf>,
    columns: &Columns,
) -> Result<()> {
    let output_path = output.unwrap_or_else(|| default_output_path(input));
    process_csv(processor, policy, input, &output_path, columns)?;

    println!("Output written to: {}", output_path.display());
    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "segments".to_string());
    input.with_file_name(format!("{}_differential.csv", stem))
}

fn process_csv<S: ElevationSource + Clone>(
    processor: &BatchProcessor<S>,
    policy: BatchPolicy,
    input: &Path,
    output_path: &Path,
    columns: &Columns,
) -> Result<()> {
    let file = File::open(input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let indices = columns.resolve(&headers)?;
    let processor = processor.clone().with_format(columns.format());

    // Collect records for progress bar
    let records: Vec<StringRecord> = reader.records().collect::<Result<_, _>>()?;
    let rows: Vec<String> = records.iter().map(|r| indices.row(r)).collect();

    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    // Rows are pulled lazily, so the bar advances as each one is measured.
    let tracked = rows.iter().inspect(|_| pb.inc(1));
    let cells: Vec<String> = match policy {
        BatchPolicy::FailFast => {
            let differentials = processor.process_batch(tracked);
            pb.finish_and_clear();
            differentials
                .context("Batch aborted, no output written")?
                .into_iter()
                .map(|d| d.to_string())
                .collect()
        }
        BatchPolicy::CollectAll => {
            let report = processor.process_batch_collect(tracked);
            pb.finish_and_clear();
            if report.failed() > 0 {
                tracing::warn!(
                    failed = report.failed(),
                    total = report.rows.len(),
                    "Some rows failed, marked in the output"
                );
            }
            report
                .rows
                .into_iter()
                .map(|r| match r {
                    Ok(d) => d.to_string(),
                    Err(e) => format!("error: {}", e.kind),
                })
                .collect()
        }
    };

    let output_file = File::create(output_path).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.push(OUTPUT_COLUMN);
    writer.write_record(&new_headers)?;

    for (record, cell) in records.iter().zip(&cells) {
        let mut new_record: Vec<&str> = record.iter().collect();
        new_record.push(cell);
        writer.write_record(&new_record)?;
    }

    writer.flush()?;
    tracing::info!(
        records = records.len(),
        output = %output_path.display(),
        "Differential column written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elevdiff::{Coordinate, ElevationClient, RetryPolicy, SourceError};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Elevation rises 1 m per 0.001° of latitude.
    #[derive(Clone)]
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

    fn separate() -> Columns {
        Columns::Separate {
            lat: "lat".into(),
            lon: "lon".into(),
            bearing: "bearing".into(),
            distance: "distance".into(),
        }
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/segments.csv")),
            PathBuf::from("/data/segments_differential.csv")
        );
    }

    #[test]
    fn test_process_csv_separate_columns() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        fs::write(
            &input,
            "name,lat,lon,bearing,distance\nA,10,20,180,1000\nB,10,20,0,1000\n",
        )
        .unwrap();

        process_csv(&processor(), BatchPolicy::FailFast, &input, &output, &separate()).unwrap();

        let written = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "name,lat,lon,bearing,distance,elevation_difference");
        assert_eq!(lines[1], "A,10,20,180,1000,8.99");
        assert_eq!(lines[2], "B,10,20,0,1000,-8.99");
    }

    #[test]
    fn test_process_csv_combined_column() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        fs::write(&input, "coords\n10 20;180;1000\n").unwrap();

        let columns = Columns::Combined("coords".into());
        process_csv(&processor(), BatchPolicy::FailFast, &input, &output, &columns).unwrap();

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("10 20;180;1000,8.99"));
    }

    #[test]
    fn test_fail_fast_writes_no_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        fs::write(&input, "lat,lon,bearing,distance\n10,20,180,1000\n95,20,180,1000\n").unwrap();

        let err = process_csv(&processor(), BatchPolicy::FailFast, &input, &output, &separate())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("row 2"));
        assert!(!output.exists());
    }

    #[test]
    fn test_collect_all_marks_failed_rows() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        fs::write(&input, "lat,lon,bearing,distance\n95,20,180,1000\n10,20,180,1000\n").unwrap();

        process_csv(&processor(), BatchPolicy::CollectAll, &input, &output, &separate()).unwrap();

        let written = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert!(lines[1].contains("error: latitude out of range"));
        assert_eq!(lines[2], "10,20,180,1000,8.99");
    }

    #[test]
    fn test_missing_column() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "lat,lon,distance\n10,20,1000\n").unwrap();

        let err = process_csv(
            &processor(),
            BatchPolicy::FailFast,
            &input,
            &dir.path().join("out.csv"),
            &separate(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("bearing"));
    }
}
