use std::env;

use crate::error::ConfigError;

pub const DEFAULT_ZOOM: u32 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "debug";

/// Mean Earth radius in metres (IUGG), as used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

pub const GPX_EXTENSION: &str = ".gpx";
pub const MAP_KEY: &str = "map.html";
pub const MAP_CONTENT_TYPE: &str = "text/html";

/// Options for a single map rendering, built once per invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    /// `(latitude, longitude)` overriding the computed centroid.
    pub center: Option<(f64, f64)>,
    pub zoom: u32,
    pub log_level: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: None,
            zoom: DEFAULT_ZOOM,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl MapConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. The center is only set when
    /// both `START_LATITUDE` and `START_LONGITUDE` are present.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let (Some(lat), Some(lon)) = (lookup("START_LATITUDE"), lookup("START_LONGITUDE")) {
            config.center = Some((
                parse_var("START_LATITUDE", &lat)?,
                parse_var("START_LONGITUDE", &lon)?,
            ));
        }
        if let Some(zoom) = lookup("ZOOM_START") {
            config.zoom = parse_var("ZOOM_START", &zoom)?;
        }
        if let Some(level) = lookup("LOG_LVL") {
            config.log_level = level;
        }

        Ok(config)
    }
}

/// Where tracks come from and where the rendered map goes.
#[derive(Debug, Clone, Default)]
pub struct PublishConfig {
    pub input_bucket: String,
    pub output_bucket: String,
    /// S3-compatible endpoint. Buckets are local directories when unset.
    pub storage_endpoint: Option<String>,
    pub storage_token: Option<String>,
    pub cdn_purge_url: Option<String>,
    pub cdn_token: Option<String>,
}

impl PublishConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            input_bucket: lookup("INPUT_BUCKET").unwrap_or_default(),
            output_bucket: lookup("OUTPUT_BUCKET").unwrap_or_default(),
            storage_endpoint: lookup("STORAGE_ENDPOINT"),
            storage_token: lookup("STORAGE_TOKEN"),
            cdn_purge_url: lookup("CDN_PURGE_URL"),
            cdn_token: lookup("CDN_TOKEN"),
        }
    }
}

/// Translate level names as written in deployment configs (`DEBUG`,
/// `WARNING`, `CRITICAL`, ...) into tracing filter directives.
pub fn tracing_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" | "notset" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "critical" | "fatal" => "error",
        "off" => "off",
        _ => "info",
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}
