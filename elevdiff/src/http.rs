//! Remote elevation APIs over HTTP.
//!
//! This module is only available when the `http` feature is enabled.
//!
//! # Providers
//!
//! - **Open-Elevation**: free, no authentication
//!   (`https://api.open-elevation.com/api/v1/lookup?locations={lat},{lon}`)
//! - **Google Maps Elevation API**: requires an API key
//! - **Custom**: any endpoint answering in the same JSON shape, addressed by a
//!   URL template with `{lat}` and `{lon}` placeholders
//!
//! All of them answer with:
//!
//! ```json
//! { "results": [ { "elevation": 455.0, "location": { ... } } ] }
//! ```

use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::projection::Coordinate;
use crate::provider::{ElevationSource, SourceError};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const OPEN_ELEVATION_URL: &str = "https://api.open-elevation.com/api/v1/lookup";
const GOOGLE_MAPS_URL: &str = "https://maps.googleapis.com/maps/api/elevation/json";

/// Known elevation APIs.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum ProviderApi {
    /// Open-Elevation public API.
    #[default]
    OpenElevation,

    /// Google Maps Elevation API.
    GoogleMaps {
        /// Google Maps Platform API key
        api_key: String,
    },

    /// Custom URL template.
    /// Use `{lat}` and `{lon}` as placeholders for the coordinate.
    ///
    /// Example: `https://elevation.example.com/lookup?locations={lat},{lon}`
    Custom {
        /// URL template with placeholders
        url_template: String,
    },
}

impl fmt::Debug for ProviderApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderApi::OpenElevation => f.write_str("OpenElevation"),
            ProviderApi::GoogleMaps { .. } => f
                .debug_struct("GoogleMaps")
                .field("api_key", &"<redacted>")
                .finish(),
            ProviderApi::Custom { url_template } => f
                .debug_struct("Custom")
                .field("url_template", url_template)
                .finish(),
        }
    }
}

impl ProviderApi {
    /// Resolve a provider by name.
    ///
    /// Accepted names: `open-elevation`, `google`, `custom`. `google` needs
    /// `api_key`, `custom` needs `url_template`.
    pub fn from_name(
        name: &str,
        api_key: Option<String>,
        url_template: Option<String>,
    ) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "open-elevation" | "openelevation" | "open_elevation" => Ok(ProviderApi::OpenElevation),
            "google" | "google-maps" | "googlemaps" => match api_key {
                Some(api_key) if !api_key.is_empty() => Ok(ProviderApi::GoogleMaps { api_key }),
                _ => Err(Error::config("the google provider requires an API key")),
            },
            "custom" => match url_template {
                Some(url_template) if !url_template.is_empty() => {
                    Ok(ProviderApi::Custom { url_template })
                }
                _ => Err(Error::config("the custom provider requires a URL template")),
            },
            other => Err(Error::config(format!(
                "unknown elevation provider '{}' (expected open-elevation, google or custom)",
                other
            ))),
        }
    }

    /// Short provider name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderApi::OpenElevation => "open-elevation",
            ProviderApi::GoogleMaps { .. } => "google",
            ProviderApi::Custom { .. } => "custom",
        }
    }

    /// Build the lookup URL for a coordinate.
    pub fn lookup_url(&self, coordinate: Coordinate) -> String {
        match self {
            ProviderApi::OpenElevation => format!(
                "{}?locations={},{}",
                OPEN_ELEVATION_URL, coordinate.lat, coordinate.lon
            ),
            ProviderApi::GoogleMaps { api_key } => format!(
                "{}?locations={},{}&key={}",
                GOOGLE_MAPS_URL, coordinate.lat, coordinate.lon, api_key
            ),
            ProviderApi::Custom { url_template } => url_template
                .replace("{lat}", &coordinate.lat.to_string())
                .replace("{lon}", &coordinate.lon.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<LookupResult>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    elevation: Option<f64>,
}

/// Single-attempt elevation lookups against a remote API.
///
/// Wrap it in an [`ElevationClient`](crate::provider::ElevationClient) to get
/// retries.
#[derive(Debug, Clone)]
pub struct HttpElevationSource {
    client: Client,
    api: ProviderApi,
}

impl HttpElevationSource {
    /// Create a source for the given API and request timeout.
    pub fn new(api: ProviderApi, timeout: Duration) -> Result<Self> {
        if let ProviderApi::Custom { url_template } = &api {
            if url_template.is_empty() {
                return Err(Error::config("No elevation URL template configured"));
            }
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api })
    }

    /// The API this source talks to.
    pub fn api(&self) -> &ProviderApi {
        &self.api
    }
}

impl ElevationSource for HttpElevationSource {
    fn lookup(&self, coordinate: Coordinate) -> std::result::Result<f64, SourceError> {
        let url = self.api.lookup_url(coordinate);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| SourceError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Transport(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .map_err(|e| SourceError::Transport(e.without_url().to_string()))?;
        tracing::trace!(provider = self.api.name(), body = %body, "Elevation API response");

        parse_elevation(&body)
    }
}

/// Extract the first elevation from a lookup response body.
fn parse_elevation(body: &str) -> std::result::Result<f64, SourceError> {
    let parsed: LookupResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::Malformed(format!("invalid JSON: {}", e)))?;

    let first = parsed.results.first().ok_or_else(|| {
        let detail = match (parsed.status.as_deref(), parsed.error_message.as_deref()) {
            (Some(status), Some(message)) => format!(" (status {}: {})", status, message),
            (Some(status), None) => format!(" (status {})", status),
            _ => String::new(),
        };
        SourceError::Malformed(format!("response has no results{}", detail))
    })?;

    first
        .elevation
        .ok_or_else(|| SourceError::Malformed("result has no elevation".to_string()))
}
