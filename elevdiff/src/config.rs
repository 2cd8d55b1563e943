//! Engine configuration.
//!
//! [`EngineConfig`] gathers everything needed to assemble a
//! [`BatchProcessor`](crate::batch::BatchProcessor): the retry policy, the row
//! format, the batch policy and, with the `http` feature, the elevation API
//! and request timeout.
//!
//! ```ignore
//! use elevdiff::EngineConfig;
//!
//! let processor = EngineConfig::from_env()?.build()?;
//! let differentials = processor.process_batch(["41.2995 69.2401 45 1000"])?;
//! ```

use std::time::Duration;

use crate::batch::{BatchPolicy, BatchProcessor};
use crate::error::{Error, Result};
use crate::provider::{ElevationClient, ElevationSource, RetryPolicy};
use crate::segment::RowFormat;

#[cfg(feature = "http")]
use crate::http::{HttpElevationSource, ProviderApi, DEFAULT_TIMEOUT_SECS};

/// Configuration for the differential engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Retry budget and pause for elevation lookups.
    pub retry: RetryPolicy,
    /// Textual layout of input rows.
    pub format: RowFormat,
    /// How adapters should treat failing rows.
    pub policy: BatchPolicy,
    /// Elevation API to query.
    #[cfg(feature = "http")]
    pub provider: ProviderApi,
    /// HTTP request timeout in seconds.
    #[cfg(feature = "http")]
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            format: RowFormat::default(),
            policy: BatchPolicy::default(),
            #[cfg(feature = "http")]
            provider: ProviderApi::default(),
            #[cfg(feature = "http")]
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    /// Create a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `ELEVDIFF_PROVIDER` | `open-elevation`, `google` or `custom`* | `open-elevation` |
    /// | `ELEVDIFF_API_KEY` | API key for `google`* | None |
    /// | `ELEVDIFF_URL_TEMPLATE` | URL template for `custom`* | None |
    /// | `ELEVDIFF_TIMEOUT_SECS` | HTTP request timeout* | 30 |
    /// | `ELEVDIFF_MAX_ATTEMPTS` | Attempts per lookup | 3 |
    /// | `ELEVDIFF_RETRY_DELAY_MS` | Pause between attempts | 2000 |
    /// | `ELEVDIFF_ROW_FORMAT` | `whitespace` or `semicolon` | `whitespace` |
    /// | `ELEVDIFF_POLICY` | `fail-fast` or `collect-all` | `fail-fast` |
    ///
    /// *Only used when the `http` feature is enabled.
    ///
    /// Unparseable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unknown provider, format or policy names,
    /// and when the selected provider is missing its key or template.
    pub fn from_env() -> Result<Self> {
        let defaults = RetryPolicy::default();
        let max_attempts = env_parse("ELEVDIFF_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts);
        let delay = env_parse("ELEVDIFF_RETRY_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.delay);

        let format = match std::env::var("ELEVDIFF_ROW_FORMAT") {
            Ok(value) => value.parse::<RowFormat>().map_err(Error::config)?,
            Err(_) => RowFormat::default(),
        };

        let policy = match std::env::var("ELEVDIFF_POLICY") {
            Ok(value) => value.parse::<BatchPolicy>().map_err(Error::config)?,
            Err(_) => BatchPolicy::default(),
        };

        #[cfg(feature = "http")]
        let provider = match std::env::var("ELEVDIFF_PROVIDER") {
            Ok(name) => ProviderApi::from_name(
                &name,
                std::env::var("ELEVDIFF_API_KEY").ok(),
                std::env::var("ELEVDIFF_URL_TEMPLATE").ok(),
            )?,
            Err(_) => ProviderApi::default(),
        };

        Ok(Self {
            retry: RetryPolicy::new(max_attempts, delay),
            format,
            policy,
            #[cfg(feature = "http")]
            provider,
            #[cfg(feature = "http")]
            timeout_secs: env_parse("ELEVDIFF_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the row format.
    pub fn with_format(mut self, format: RowFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the batch policy.
    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the elevation API.
    #[cfg(feature = "http")]
    pub fn with_provider(mut self, provider: ProviderApi) -> Self {
        self.provider = provider;
        self
    }

    /// Set the HTTP request timeout.
    #[cfg(feature = "http")]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Assemble a processor around `source` with this retry policy and row format.
    pub fn processor<S: ElevationSource>(&self, source: S) -> BatchProcessor<S> {
        BatchProcessor::new(ElevationClient::with_retry(source, self.retry)).with_format(self.format)
    }

    /// Create the configured HTTP elevation source.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created (e.g. TLS
    /// initialization failure) or a custom template is empty.
    #[cfg(feature = "http")]
    pub fn source(&self) -> Result<HttpElevationSource> {
        let source =
            HttpElevationSource::new(self.provider.clone(), Duration::from_secs(self.timeout_secs))?;
        tracing::debug!(
            provider = self.provider.name(),
            max_attempts = self.retry.max_attempts,
            retry_delay_ms = self.retry.delay.as_millis() as u64,
            timeout_secs = self.timeout_secs,
            "Elevation source ready"
        );
        Ok(source)
    }

    /// Build a processor backed by the configured HTTP elevation API.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::source`].
    #[cfg(feature = "http")]
    pub fn build(&self) -> Result<BatchProcessor<HttpElevationSource>> {
        Ok(self.processor(self.source()?))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests touching the process environment must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 8] = [
        "ELEVDIFF_PROVIDER",
        "ELEVDIFF_API_KEY",
        "ELEVDIFF_URL_TEMPLATE",
        "ELEVDIFF_TIMEOUT_SECS",
        "ELEVDIFF_MAX_ATTEMPTS",
        "ELEVDIFF_RETRY_DELAY_MS",
        "ELEVDIFF_ROW_FORMAT",
        "ELEVDIFF_POLICY",
    ];

    /// Run `f` with exactly the given variables set, restoring afterwards.
    fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let saved: Vec<_> = VARS.iter().map(|k| (*k, std::env::var(k).ok())).collect();

        for key in VARS {
            std::env::remove_var(key);
        }
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let result = f();

        for (key, value) in saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        result
    }

    #[test]
    fn test_from_env_defaults() {
        let config = with_env(&[], EngineConfig::from_env).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay, Duration::from_secs(2));
    }

    #[test]
    fn test_from_env_with_values() {
        let config = with_env(
            &[
                ("ELEVDIFF_MAX_ATTEMPTS", "5"),
                ("ELEVDIFF_RETRY_DELAY_MS", "250"),
                ("ELEVDIFF_ROW_FORMAT", "semicolon"),
                ("ELEVDIFF_POLICY", "collect-all"),
            ],
            EngineConfig::from_env,
        )
        .unwrap();

        assert_eq!(config.retry, RetryPolicy::new(5, Duration::from_millis(250)));
        assert_eq!(config.format, RowFormat::Semicolon);
        assert_eq!(config.policy, BatchPolicy::CollectAll);
    }

    #[test]
    fn test_from_env_unparseable_number_uses_default() {
        let config = with_env(&[("ELEVDIFF_MAX_ATTEMPTS", "many")], EngineConfig::from_env).unwrap();
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_from_env_unknown_policy() {
        let result = with_env(&[("ELEVDIFF_POLICY", "sometimes")], EngineConfig::from_env);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_from_env_provider() {
        let config = with_env(
            &[
                ("ELEVDIFF_PROVIDER", "google"),
                ("ELEVDIFF_API_KEY", "abc"),
                ("ELEVDIFF_TIMEOUT_SECS", "7"),
            ],
            EngineConfig::from_env,
        )
        .unwrap();
        assert_eq!(
            config.provider,
            ProviderApi::GoogleMaps {
                api_key: "abc".to_string()
            }
        );
        assert_eq!(config.timeout_secs, 7);

        let missing_key = with_env(&[("ELEVDIFF_PROVIDER", "google")], EngineConfig::from_env);
        assert!(missing_key.is_err());
    }

    #[test]
    fn test_builder_methods() {
        let config = EngineConfig::default()
            .with_retry(RetryPolicy::new(1, Duration::ZERO))
            .with_format(RowFormat::Semicolon)
            .with_policy(BatchPolicy::CollectAll);

        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.format, RowFormat::Semicolon);
        assert_eq!(config.policy, BatchPolicy::CollectAll);
    }

    #[test]
    fn test_processor_around_custom_source() {
        struct Flat;
        impl ElevationSource for Flat {
            fn lookup(&self, _: crate::Coordinate) -> std::result::Result<f64, crate::SourceError> {
                Ok(100.0)
            }
        }

        let config = EngineConfig::default().with_retry(RetryPolicy::new(1, Duration::ZERO));
        let processor = config.processor(Flat);
        assert_eq!(processor.client().retry_policy().max_attempts, 1);
        assert_eq!(processor.process_row("0 0 90 1000").unwrap().value_m, 0.0);
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_build_processor() {
        let config = EngineConfig::default()
            .with_format(RowFormat::Semicolon)
            .with_timeout(5);
        let processor = config.build().unwrap();
        assert_eq!(processor.format(), RowFormat::Semicolon);
        assert_eq!(processor.client().retry_policy(), RetryPolicy::default());
    }
}
