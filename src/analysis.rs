use std::io::Read;

use gpx::{Gpx, TrackSegment, Waypoint};
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::EARTH_RADIUS_M;

/// How distances are computed across a gap between two track segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SegmentJoin {
    /// The last point of the previous segment is the predecessor of the
    /// first point of the next one.
    #[default]
    Continuous,
    /// Every segment starts without a predecessor.
    Restart,
}

/// One row of a track's statistics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord {
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: Option<f64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub time: Option<OffsetDateTime>,
    /// Metres per second.
    pub speed: Option<f64>,
    /// Metres from the previous point.
    pub distance: Option<f64>,
    pub elevation_diff: Option<f64>,
    pub cum_elevation: f64,
    pub cum_distance: f64,
    /// Percent.
    pub gradient: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatsTable {
    pub rows: Vec<PointRecord>,
}

impl StatsTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Concatenate per-track tables. `None` when there were no tables at
    /// all, which is different from tables without rows.
    pub fn concat<'a, I>(tables: I) -> Option<StatsTable>
    where
        I: IntoIterator<Item = &'a StatsTable>,
    {
        let mut combined: Option<StatsTable> = None;
        for table in tables {
            combined
                .get_or_insert_with(StatsTable::default)
                .rows
                .extend(table.rows.iter().cloned());
        }
        combined
    }

    /// Mean `(latitude, longitude)` over all rows.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.rows.is_empty() {
            return None;
        }
        let n = self.rows.len() as f64;
        let lat = self.rows.iter().map(|r| r.latitude).sum::<f64>() / n;
        let lon = self.rows.iter().map(|r| r.longitude).sum::<f64>() / n;
        Some((lat, lon))
    }
}

/// A parsed recording ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    /// `(latitude, longitude)` pairs across all segments.
    pub points: Vec<(f64, f64)>,
    pub table: StatsTable,
}

impl Track {
    pub fn from_gpx(name: impl Into<String>, gpx: &Gpx, join: SegmentJoin) -> Self {
        let segments: Vec<&TrackSegment> = gpx
            .tracks
            .iter()
            .flat_map(|track| track.segments.iter())
            .collect();
        let (points, table) = analyze_segments(&segments, join);
        Self {
            name: name.into(),
            points,
            table,
        }
    }

    pub fn read<R: Read>(
        name: impl Into<String>,
        reader: R,
        join: SegmentJoin,
    ) -> Result<Self, gpx::errors::GpxError> {
        let gpx = gpx::read(reader)?;
        Ok(Self::from_gpx(name, &gpx, join))
    }
}

/// Walk the segments in order and build the flat point list along with the
/// per-point statistics table.
pub fn analyze_segments(
    segments: &[&TrackSegment],
    join: SegmentJoin,
) -> (Vec<(f64, f64)>, StatsTable) {
    let mut points = Vec::new();
    let mut rows = Vec::new();

    let mut prev: Option<&Waypoint> = None;
    let mut dist_sum = 0.0;
    let mut elev_sum = 0.0;

    for segment in segments {
        for (idx, wp) in segment.points.iter().enumerate() {
            let lat = wp.point().y();
            let lon = wp.point().x();
            points.push((lat, lon));

            let pred = match join {
                SegmentJoin::Restart if idx == 0 => None,
                _ => prev,
            };

            let distance = pred.map(|p| haversine_m(p.point().y(), p.point().x(), lat, lon));
            let elevation_diff = pred
                .and_then(|p| Some(wp.elevation? - p.elevation?))
                .map(|d| round_to(d, 2));

            if let Some(d) = distance {
                dist_sum += d;
            }
            if let Some(e) = elevation_diff {
                elev_sum += e;
            }

            rows.push(PointRecord {
                longitude: lon,
                latitude: lat,
                elevation: wp.elevation,
                time: wp.time.map(OffsetDateTime::from),
                speed: point_speed(&segment.points, idx),
                distance,
                elevation_diff,
                cum_elevation: round_to(elev_sum, 2),
                cum_distance: round_to(dist_sum, 2),
                gradient: gradient(elevation_diff, distance),
            });

            prev = Some(wp);
        }
    }

    (points, StatsTable { rows })
}

/// Great-circle distance in metres between two latitude/longitude pairs.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().asin()
}

/// Percent slope, undefined without a positive run.
pub fn gradient(elevation_diff: Option<f64>, distance: Option<f64>) -> Option<f64> {
    match (elevation_diff, distance) {
        (Some(rise), Some(run)) if run != 0.0 => Some(round_to(rise / run * 100.0, 1)),
        _ => None,
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}

/// Speed at `idx` within its own segment: the mean of the speeds to the
/// neighbouring points where both are known, else whichever one is.
fn point_speed(points: &[Waypoint], idx: usize) -> Option<f64> {
    let wp = points.get(idx)?;
    let before = idx
        .checked_sub(1)
        .and_then(|i| points.get(i))
        .and_then(|p| speed_between(wp, p));
    let after = points.get(idx + 1).and_then(|p| speed_between(wp, p));

    match (before, after) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(s), None) | (None, Some(s)) => Some(s),
        (None, None) => None,
    }
}

fn speed_between(a: &Waypoint, b: &Waypoint) -> Option<f64> {
    let ta: OffsetDateTime = a.time?.into();
    let tb: OffsetDateTime = b.time?.into();
    let seconds = (tb - ta).as_seconds_f64().abs();
    if seconds == 0.0 {
        return None;
    }

    let flat = haversine_m(a.point().y(), a.point().x(), b.point().y(), b.point().x());
    let length = match (a.elevation, b.elevation) {
        (Some(ea), Some(eb)) => flat.hypot(eb - ea),
        _ => flat,
    };
    if length == 0.0 {
        return None;
    }

    Some(length / seconds)
}
