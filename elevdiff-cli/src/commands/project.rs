use anyhow::{Context, Result};
use elevdiff::{project, SegmentRequest};
use serde::Serialize;

#[derive(Serialize)]
struct ProjectionResponse {
    origin_lat: f64,
    origin_lon: f64,
    bearing: f64,
    distance: f64,
    lat: f64,
    lon: f64,
}

pub fn run(lat: f64, lon: f64, bearing: f64, distance: f64, json: bool) -> Result<()> {
    let request =
        SegmentRequest::new(lat, lon, bearing, distance).context("Invalid segment")?;
    let dest = project(request.origin(), request.bearing_deg(), request.distance_m());

    if json {
        let response = ProjectionResponse {
            origin_lat: lat,
            origin_lon: lon,
            bearing,
            distance,
            lat: dest.lat,
            lon: dest.lon,
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("{:.6} {:.6}", dest.lat, dest.lon);
    }

    Ok(())
}
