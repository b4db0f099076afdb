use time::formatting::Formattable;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use crate::analysis::{Track, round_to};

/// Aggregates shown in a track's popup.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub name: String,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
    pub duration: Option<Duration>,
    /// Metres.
    pub distance: Option<f64>,
    /// Metres per second.
    pub mean_speed: Option<f64>,
    pub max_elevation: Option<f64>,
    pub uphill: f64,
    pub downhill: f64,
}

impl TrackSummary {
    pub fn from_track(track: &Track) -> Self {
        let rows = &track.table.rows;

        let start = rows.first().and_then(|r| r.time);
        let end = rows.last().and_then(|r| r.time);
        let duration = match (start, end) {
            (Some(s), Some(e)) => Some(e - s),
            _ => None,
        };

        let speeds: Vec<f64> = rows.iter().filter_map(|r| r.speed).collect();
        let mean_speed = if speeds.is_empty() {
            None
        } else {
            Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
        };

        let max_elevation = rows
            .iter()
            .filter_map(|r| r.elevation)
            .fold(None, |acc: Option<f64>, e| Some(acc.map_or(e, |m| m.max(e))));

        let diffs = rows.iter().filter_map(|r| r.elevation_diff);
        let uphill = diffs.clone().filter(|d| *d > 0.0).sum::<f64>();
        let downhill = diffs.filter(|d| *d < 0.0).sum::<f64>().abs();

        Self {
            name: track.name.clone(),
            start,
            end,
            duration,
            distance: rows.last().map(|r| r.cum_distance),
            mean_speed,
            max_elevation,
            uphill,
            downhill,
        }
    }

    /// Labelled popup lines as `(label, icon, value)`.
    pub fn attributes(&self) -> Vec<(&'static str, &'static str, String)> {
        let date = format_description!("[month]/[day]/[year]");
        let clock = format_description!("[hour]:[minute]:[second]");

        vec![
            ("Date", "calendar", format_time(self.start, date)),
            ("Start", "clock", format_time(self.start, clock)),
            ("End", "flag-checkered", format_time(self.end, clock)),
            (
                "Duration",
                "stopwatch",
                self.duration
                    .map(format_duration)
                    .unwrap_or_else(|| MISSING.to_string()),
            ),
            (
                "Distance",
                "arrows-left-right",
                with_unit(self.distance.map(|m| m / 1000.0), "km"),
            ),
            (
                "Average Speed",
                "gauge-high",
                with_unit(self.mean_speed.map(|s| s * 3.6), "km/h"),
            ),
            (
                "Max. Elevation",
                "mountain",
                with_unit(self.max_elevation, "m"),
            ),
            ("Uphill", "arrow-trend-up", with_unit(Some(self.uphill), "m")),
            (
                "Downhill",
                "arrow-trend-down",
                with_unit(Some(self.downhill), "m"),
            ),
        ]
    }
}

const MISSING: &str = "-";

fn format_time<F: Formattable + ?Sized>(t: Option<OffsetDateTime>, format: &F) -> String {
    t.and_then(|t| t.format(format).ok())
        .unwrap_or_else(|| MISSING.to_string())
}

fn with_unit(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:?} {unit}", round_to(v, 2)),
        None => MISSING.to_string(),
    }
}

/// `{h}h, {m}min, {s}s`, with whole days folded into hours.
pub fn format_duration(d: Duration) -> String {
    let total = d.whole_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}h, {minutes}min, {seconds}s")
}
