/// Base layers offered in the map's layer control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenStreetMap,
    OpenTopoMap,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Self::OpenStreetMap, Self::OpenTopoMap];

    /// Leaflet URL template.
    pub fn url_template(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            Self::OpenTopoMap => "https://tile.opentopomap.org/{z}/{x}/{y}.png",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "OpenStreet Map",
            Self::OpenTopoMap => "OpenTopo Map",
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => {
                r#"&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors"#
            }
            Self::OpenTopoMap => {
                r#"Map data: &copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors, SRTM | Map style: &copy; <a href="https://opentopomap.org">OpenTopoMap</a> (CC-BY-SA)"#
            }
        }
    }

    pub fn max_zoom(&self) -> u32 {
        match self {
            Self::OpenStreetMap => 19,
            Self::OpenTopoMap => 17,
        }
    }
}
