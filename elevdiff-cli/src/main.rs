use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use elevdiff::http::ProviderApi;
use elevdiff::{BatchPolicy, EngineConfig, RetryPolicy, RowFormat};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

/// Terrain elevation differentials along bearing segments
#[derive(Parser)]
#[command(name = "elevdiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Elevation provider: open-elevation, google or custom
    #[arg(
        long,
        env = "ELEVDIFF_PROVIDER",
        default_value = "open-elevation",
        global = true
    )]
    provider: String,

    /// API key for the google provider
    #[arg(long, env = "ELEVDIFF_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// URL template for the custom provider ({lat} and {lon} placeholders)
    #[arg(long, env = "ELEVDIFF_URL_TEMPLATE", global = true)]
    url_template: Option<String>,

    /// Attempts per elevation lookup
    #[arg(long, env = "ELEVDIFF_MAX_ATTEMPTS", default_value_t = 3, global = true)]
    max_attempts: u32,

    /// Pause between attempts in milliseconds
    #[arg(
        long,
        env = "ELEVDIFF_RETRY_DELAY_MS",
        default_value_t = 2000,
        global = true
    )]
    retry_delay_ms: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "ELEVDIFF_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout: u64,

    /// Batch policy: fail-fast or collect-all
    #[arg(
        long,
        env = "ELEVDIFF_POLICY",
        default_value = "fail-fast",
        global = true
    )]
    policy: BatchPolicy,

    /// Shorthand for --policy collect-all
    #[arg(short, long, global = true)]
    keep_going: bool,

    /// Log every lookup attempt
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project the destination of a single segment
    Project {
        /// Origin latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Origin longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Bearing in degrees clockwise from north
        #[arg(long)]
        bearing: f64,

        /// Distance in meters
        #[arg(long)]
        distance: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Compute differentials for rows given as arguments or on stdin
    Diff {
        /// Segment rows, e.g. "41.2995 69.2401 45 1000" (read from stdin if omitted)
        rows: Vec<String>,

        /// Row format: whitespace or semicolon
        #[arg(long, env = "ELEVDIFF_ROW_FORMAT", default_value = "whitespace")]
        format: RowFormat,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Append differentials to every record of a CSV file
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Output file (defaults to <input>_differential.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for origin latitude
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column name for origin longitude
        #[arg(long, default_value = "lon")]
        lon_col: String,

        /// Column name for bearing
        #[arg(long, default_value = "bearing")]
        bearing_col: String,

        /// Column name for distance
        #[arg(long, default_value = "distance")]
        distance_col: String,

        /// Single column holding "lat lon;bearing;distance" rows (overrides the four columns)
        #[arg(long)]
        coords_col: Option<String>,
    },
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        let provider = ProviderApi::from_name(
            &self.provider,
            self.api_key.clone(),
            self.url_template.clone(),
        )?;
        let policy = if self.keep_going {
            BatchPolicy::CollectAll
        } else {
            self.policy
        };

        Ok(EngineConfig::default()
            .with_provider(provider)
            .with_timeout(self.timeout)
            .with_retry(RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.retry_delay_ms),
            ))
            .with_policy(policy))
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "elevdiff=debug" } else { "elevdiff=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Project {
            lat,
            lon,
            bearing,
            distance,
            json,
        } => commands::project::run(*lat, *lon, *bearing, *distance, *json),
        Commands::Diff { rows, format, json } => {
            let config = cli.engine_config()?.with_format(*format);
            let processor = config.build().context("Failed to create elevation client")?;
            commands::diff::run(&processor, config.policy, rows.clone(), *json)
        }
        Commands::Batch {
            input,
            output,
            lat_col,
            lon_col,
            bearing_col,
            distance_col,
            coords_col,
        } => {
            let columns = match coords_col {
                Some(col) => commands::batch::Columns::Combined(col.clone()),
                None => commands::batch::Columns::Separate {
                    lat: lat_col.clone(),
                    lon: lon_col.clone(),
                    bearing: bearing_col.clone(),
                    distance: distance_col.clone(),
                },
            };
            let config = cli.engine_config()?;
            let processor = config.build().context("Failed to create elevation client")?;
            commands::batch::run(&processor, config.policy, input, output.clone(), &columns)
        }
    }
}
