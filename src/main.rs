use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trailmap::analysis::SegmentJoin;
use trailmap::cdn::HttpInvalidator;
use trailmap::config::{self, MapConfig, PublishConfig};
use trailmap::handler;
use trailmap::loader;
use trailmap::render;
use trailmap::storage::AnyStore;

#[derive(Parser)]
#[command(
    name = "trailmap",
    about = "Interactive map of GPX activities grouped by type and location"
)]
struct Cli {
    /// Log level (overrides LOG_LVL; RUST_LOG takes precedence over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// How distances are measured across track segment gaps
    #[arg(long, global = true, default_value = "continuous")]
    segment_join: JoinPolicy,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the map from a local directory to an HTML file
    Render {
        /// Directory containing {ActivityType}/{group}/*.gpx
        #[arg(short, long, default_value = "activities")]
        input_dir: String,

        /// Output file path
        #[arg(short, long, default_value = "output/map.html")]
        output: String,

        /// Initial zoom level (overrides ZOOM_START)
        #[arg(short, long)]
        zoom: Option<u32>,

        /// Map center latitude (overrides START_LATITUDE)
        #[arg(long, requires = "center_lon")]
        center_lat: Option<f64>,

        /// Map center longitude (overrides START_LONGITUDE)
        #[arg(long, requires = "center_lat")]
        center_lon: Option<f64>,
    },

    /// Rebuild map.html from the input bucket, upload it and purge the CDN
    Publish {
        /// Input bucket (overrides INPUT_BUCKET)
        #[arg(long)]
        input_bucket: Option<String>,

        /// Output bucket (overrides OUTPUT_BUCKET)
        #[arg(long)]
        output_bucket: Option<String>,

        /// S3-compatible endpoint; buckets are local directories without one
        #[arg(long)]
        endpoint: Option<String>,

        /// JSON file with the triggering event, logged for traceability
        #[arg(long)]
        event: Option<String>,
    },

    /// Export the combined per-point statistics table as JSON
    Stats {
        /// Directory containing {ActivityType}/{group}/*.gpx
        #[arg(short, long, default_value = "activities")]
        input_dir: String,

        /// Output JSON file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum JoinPolicy {
    Continuous,
    Restart,
}

fn resolve_join(policy: &JoinPolicy) -> SegmentJoin {
    match policy {
        JoinPolicy::Continuous => SegmentJoin::Continuous,
        JoinPolicy::Restart => SegmentJoin::Restart,
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::tracing_level(level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn write_output(path: &str, contents: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {path}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut map_config = MapConfig::from_env().context("Invalid map configuration")?;
    if let Some(level) = cli.log_level {
        map_config.log_level = level;
    }
    init_logging(&map_config.log_level);
    let join = resolve_join(&cli.segment_join);

    match cli.command {
        Commands::Render {
            input_dir,
            output,
            zoom,
            center_lat,
            center_lon,
        } => {
            if let Some(zoom) = zoom {
                map_config.zoom = zoom;
            }
            if let (Some(lat), Some(lon)) = (center_lat, center_lon) {
                map_config.center = Some((lat, lon));
            }

            let loaded = match loader::load_dir(Path::new(&input_dir), join) {
                Ok(loaded) => loaded,
                Err(e) => {
                    tracing::error!("Failed to load activities from {input_dir}: {e}");
                    Default::default()
                }
            };
            let html = render::render_map(&loaded, &map_config);
            write_output(&output, &html)?;
            info!(
                "Saved map with {} activities to {output}",
                loaded.track_count()
            );
        }

        Commands::Publish {
            input_bucket,
            output_bucket,
            endpoint,
            event,
        } => {
            let mut publish = PublishConfig::from_env();
            if let Some(bucket) = input_bucket {
                publish.input_bucket = bucket;
            }
            if let Some(bucket) = output_bucket {
                publish.output_bucket = bucket;
            }
            if endpoint.is_some() {
                publish.storage_endpoint = endpoint;
            }
            anyhow::ensure!(
                !publish.input_bucket.is_empty() && !publish.output_bucket.is_empty(),
                "Both an input and an output bucket are required"
            );

            if let Some(event) = event {
                let raw = fs::read_to_string(&event)
                    .with_context(|| format!("Failed to read event {event}"))?;
                let value: serde_json::Value = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse event {event}"))?;
                info!("## EVENT");
                info!("{value}");
            }

            let client = reqwest::Client::builder()
                .user_agent("trailmap/0.1")
                .build()?;
            let endpoint = publish.storage_endpoint.as_deref();
            let input = AnyStore::open(
                &client,
                endpoint,
                &publish.input_bucket,
                publish.storage_token.clone(),
            );
            let output = AnyStore::open(
                &client,
                endpoint,
                &publish.output_bucket,
                publish.storage_token.clone(),
            );
            let cdn = publish
                .cdn_purge_url
                .as_ref()
                .map(|url| HttpInvalidator::new(client.clone(), url, publish.cdn_token.clone()));

            let response =
                handler::publish(&input, &output, cdn.as_ref(), &map_config, join).await;
            println!("{}", serde_json::to_string(&response)?);
        }

        Commands::Stats { input_dir, output } => {
            let loaded = loader::load_dir(Path::new(&input_dir), join)?;
            let json = serde_json::to_string_pretty(&loaded.table)
                .context("Failed to serialize statistics")?;
            match output {
                Some(path) => {
                    write_output(&path, &json)?;
                    info!("Exported {} activities to {path}", loaded.track_count());
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}
