#![allow(dead_code)]

use std::fs;
use std::path::Path;

/// `(lat, lon, elevation)` points of a single-segment track.
pub fn gpx(points: &[(f64, f64, f64)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="trailmap-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><name>fixture</name><trkseg>
"#,
    );
    for (i, (lat, lon, ele)) in points.iter().enumerate() {
        xml.push_str(&format!(
            "    <trkpt lat=\"{lat}\" lon=\"{lon}\"><ele>{ele}</ele><time>2024-06-01T09:{:02}:00Z</time></trkpt>\n",
            i
        ));
    }
    xml.push_str("  </trkseg></trk>\n</gpx>\n");
    xml
}

pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

pub const THREE_POINTS: &[(f64, f64, f64)] = &[
    (46.5000, 7.2500, 1200.0),
    (46.5010, 7.2500, 1210.0),
    (46.5020, 7.2510, 1205.0),
];

pub const ONE_POINT: &[(f64, f64, f64)] = &[(47.1000, 6.9000, 800.0)];

/// Two visible tracks plus hidden and unrelated files that must be ignored.
pub fn populate(root: &Path) {
    write(root, "Hiking/Alps/Three_Points.gpx", &gpx(THREE_POINTS));
    write(root, "Biking/Jura/Single.gpx", &gpx(ONE_POINT));

    write(root, "Hiking/Alps/.Draft.gpx", &gpx(ONE_POINT));
    write(root, "Hiking/.archive/Old.gpx", &gpx(ONE_POINT));
    write(root, "Biking/Jura/.cache/deep/Copy.gpx", &gpx(ONE_POINT));
    write(root, "Hiking/Alps/notes.txt", "not a track");
    write(root, "Swimming/Lake/Crossing.gpx", &gpx(ONE_POINT));
}
