use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::activity::ActivityType;
use crate::analysis::{SegmentJoin, StatsTable, Track};
use crate::config::GPX_EXTENSION;
use crate::error::LoadError;
use crate::storage::ObjectStore;

/// Tracks keyed by activity type, then by group (usually a location).
pub type ActivityMap = BTreeMap<ActivityType, BTreeMap<String, Vec<Track>>>;

#[derive(Debug, Default)]
pub struct LoadedTracks {
    pub activities: ActivityMap,
    /// Every track's rows, or `None` when no GPX file was found.
    pub table: Option<StatsTable>,
}

impl LoadedTracks {
    pub fn track_count(&self) -> usize {
        self.activities
            .values()
            .flat_map(|groups| groups.values())
            .map(Vec::len)
            .sum()
    }

    pub fn tracks(&self) -> impl Iterator<Item = (ActivityType, &str, &Track)> {
        self.activities.iter().flat_map(|(activity, groups)| {
            groups.iter().flat_map(move |(group, tracks)| {
                tracks.iter().map(move |t| (*activity, group.as_str(), t))
            })
        })
    }

    fn insert(&mut self, activity: ActivityType, group: &str, track: Track) {
        self.activities
            .entry(activity)
            .or_default()
            .entry(group.to_string())
            .or_default()
            .push(track);
    }

    fn finish(mut self) -> Self {
        let table = StatsTable::concat(self.tracks().map(|(_, _, t)| &t.table));
        self.table = table;
        info!("Read {} activities", self.track_count());
        self
    }
}

/// Load every `{root}/{ActivityType}/**/{group}/{name}.gpx` below a local
/// directory.
pub fn load_dir(root: &Path, join: SegmentJoin) -> Result<LoadedTracks, LoadError> {
    let mut loaded = LoadedTracks::default();

    for activity in ActivityType::ALL {
        let dir = root.join(activity.name());
        if !dir.is_dir() {
            debug!("No {activity} directory at {}", dir.display());
            continue;
        }

        let walker = WalkDir::new(&dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = entry.map_err(|source| LoadError::Walk {
                path: dir.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if !file_name.ends_with(GPX_EXTENSION) {
                continue;
            }

            let path = entry.path();
            let group = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|g| g.to_string_lossy().into_owned())
                .unwrap_or_default();

            let file = File::open(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let track = Track::read(track_name(&file_name), BufReader::new(file), join).map_err(
                |source| LoadError::Gpx {
                    path: path.display().to_string(),
                    source,
                },
            )?;

            debug!(
                "Loaded {} — {activity}/{group}, {} points",
                track.name,
                track.points.len()
            );
            loaded.insert(activity, &group, track);
        }
    }

    Ok(loaded.finish())
}

/// Load every `{ActivityType}/.../{group}/{name}.gpx` key of a store. Keys
/// under unknown top-level prefixes are ignored.
pub async fn load_store<S: ObjectStore>(
    store: &S,
    join: SegmentJoin,
) -> Result<LoadedTracks, LoadError> {
    let mut loaded = LoadedTracks::default();

    for key in store.list().await? {
        if !key.ends_with(GPX_EXTENSION) {
            continue;
        }
        let parts: Vec<&str> = key.split('/').collect();
        debug!("Parts: {parts:?}");
        if parts.iter().any(|p| p.starts_with('.')) {
            info!("Skipped {key}");
            continue;
        }

        let Ok(activity) = parts[0].parse::<ActivityType>() else {
            continue;
        };
        let [.., group, file_name] = parts.as_slice() else {
            continue;
        };

        let bytes = store.get(&key).await?;
        let track = Track::read(track_name(file_name), bytes.as_slice(), join)
            .map_err(|source| LoadError::Gpx {
                path: store.location(&key),
                source,
            })?;

        debug!(
            "Loaded {} — {activity}/{group}, {} points",
            track.name,
            track.points.len()
        );
        loaded.insert(activity, group, track);
    }

    Ok(loaded.finish())
}

/// `Lake_Loop_2.gpx` becomes `Lake Loop 2`.
pub fn track_name(file_name: &str) -> String {
    file_name
        .strip_suffix(GPX_EXTENSION)
        .unwrap_or(file_name)
        .replace('_', " ")
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
