use serde_json::{Value, json};

use crate::config::MapConfig;
use crate::loader::LoadedTracks;
use crate::summary::TrackSummary;
use crate::tiles::Provider;

const TRAIL_WEIGHT: f64 = 4.5;
const TRAIL_OPACITY: f64 = 0.5;
const POPUP_MAX_WIDTH: u32 = 300;

/// Render the full HTML document for the loaded tracks.
pub fn render_map(loaded: &LoadedTracks, config: &MapConfig) -> String {
    let center = map_center(loaded, config);
    let data = json!({
        "center": center.map(|(lat, lon)| [lat, lon]),
        "zoom": config.zoom,
        "popupMaxWidth": POPUP_MAX_WIDTH,
        "tiles": tile_layers(),
        "groups": feature_groups(loaded),
    });

    // Keep `</script>` inside strings from closing the data block.
    let data = data.to_string().replace("</", "<\\/");

    let mut html = String::from(HEAD);
    html.push_str(&format!(
        r##"<script id="map-data" type="application/json">{data}</script>"##
    ));
    html.push_str(SCRIPT);
    html.push_str("</body>\n</html>\n");
    html
}

/// Configured center, else the mean of every loaded point.
pub fn map_center(loaded: &LoadedTracks, config: &MapConfig) -> Option<(f64, f64)> {
    config
        .center
        .or_else(|| loaded.table.as_ref().and_then(|t| t.centroid()))
}

/// Popup body for one track.
pub fn popup_html(summary: &TrackSummary) -> String {
    let mut html = format!("<h4>{}</h4>", escape_html(&summary.name.to_uppercase()));
    for (label, icon, value) in summary.attributes() {
        html.push_str(&format!(
            r##"<i class="fa-solid fa-{icon}" title="{label}">  {}</i></br>"##,
            escape_html(&value),
        ));
    }
    html
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn tile_layers() -> Vec<Value> {
    Provider::ALL
        .iter()
        .map(|p| {
            json!({
                "name": p.name(),
                "url": p.url_template(),
                "attribution": p.attribution(),
                "maxZoom": p.max_zoom(),
            })
        })
        .collect()
}

/// One feature group per group name, shared by all activity types, in
/// order of first appearance.
fn feature_groups(loaded: &LoadedTracks) -> Vec<Value> {
    let mut groups: Vec<(&str, Vec<Value>)> = Vec::new();

    for (activity, group, track) in loaded.tracks() {
        if track.points.is_empty() {
            continue;
        }

        let summary = TrackSummary::from_track(track);
        let trail = json!({
            "points": track.points.iter().map(|(lat, lon)| [*lat, *lon]).collect::<Vec<_>>(),
            "color": activity.color(),
            "icon": activity.icon(),
            "weight": TRAIL_WEIGHT,
            "opacity": TRAIL_OPACITY,
            "popup": popup_html(&summary),
        });

        match groups.iter_mut().find(|(name, _)| *name == group) {
            Some((_, trails)) => trails.push(trail),
            None => groups.push((group, vec![trail])),
        }
    }

    groups
        .into_iter()
        .map(|(name, trails)| json!({ "name": escape_html(name), "trails": trails }))
        .collect()
}

const HEAD: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.2/css/all.min.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css">
<link rel="stylesheet" href="https://unpkg.com/leaflet.fullscreen@3.0.2/Control.FullScreen.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.min.js"></script>
<script src="https://unpkg.com/leaflet.fullscreen@3.0.2/Control.FullScreen.js"></script>
<style>
html, body { width: 100%; height: 100%; margin: 0; padding: 0; }
#map { position: absolute; top: 0; bottom: 0; right: 0; left: 0; }
</style>
</head>
<body>
<div id="map"></div>
"##;

const SCRIPT: &str = r##"
<script>
(function () {
  var data = JSON.parse(document.getElementById("map-data").textContent);
  var map = L.map("map", { fullscreenControl: true, fullscreenControlOptions: { position: "topright" } });
  if (data.center) {
    map.setView(data.center, data.zoom);
  } else {
    map.fitWorld();
  }

  var baseLayers = {};
  data.tiles.forEach(function (tile, i) {
    var layer = L.tileLayer(tile.url, { attribution: tile.attribution, maxZoom: tile.maxZoom });
    if (i === 0) layer.addTo(map);
    baseLayers[tile.name] = layer;
  });

  var overlays = {};
  data.groups.forEach(function (group) {
    var fg = L.featureGroup().addTo(map);
    group.trails.forEach(function (trail) {
      L.polyline(trail.points, { color: trail.color, weight: trail.weight, opacity: trail.opacity }).addTo(fg);
      var icon = L.AwesomeMarkers.icon({ icon: trail.icon, prefix: "fa", markerColor: trail.color, iconColor: "white" });
      L.marker(trail.points[0], { icon: icon }).bindPopup(trail.popup, { maxWidth: data.popupMaxWidth }).addTo(fg);
    });
    overlays[group.name] = fg;
  });

  L.control.layers(baseLayers, overlays, { position: "bottomright" }).addTo(map);
})();
</script>
"##;
