//! Basic example demonstrating elevdiff library usage.
//!
//! Run with: cargo run -p elevdiff --features http --example basic -- "41.2995 69.2401 45 1000"

use elevdiff::http::{HttpElevationSource, ProviderApi, DEFAULT_TIMEOUT_SECS};
use elevdiff::{project, BatchProcessor, ElevationClient, RowFormat, SegmentRequest};
use std::env;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Rows from the command line, or a couple of samples around Tashkent
    let mut rows: Vec<String> = env::args().skip(1).collect();
    if rows.is_empty() {
        rows = vec![
            "41.2995 69.2401 45 1000".to_string(),
            "41.2995 69.2401 225 1000".to_string(),
        ];
    }

    let source = HttpElevationSource::new(
        ProviderApi::OpenElevation,
        Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    )?;
    let processor = BatchProcessor::new(ElevationClient::new(source));

    println!("Projected destinations:");
    println!("{:-<50}", "");
    for row in &rows {
        match SegmentRequest::parse(row, RowFormat::Whitespace) {
            Ok(req) => {
                let dest = project(req.origin(), req.bearing_deg(), req.distance_m());
                println!("{} -> ({:.6}, {:.6})", row, dest.lat, dest.lon);
            }
            Err(e) => println!("{}: {}", row, e),
        }
    }

    println!("\nElevation differentials:");
    println!("{:-<50}", "");
    match processor.process_batch(&rows) {
        Ok(differentials) => {
            for (row, d) in rows.iter().zip(differentials) {
                println!("{}: {} m", row, d);
            }
        }
        Err(e) => println!("error - {}", e),
    }

    Ok(())
}
