use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::UnknownActivityType;

/// Top-level directory categories a track can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ActivityType {
    Hiking,
    Running,
    Biking,
    Skiing,
}

impl ActivityType {
    pub const ALL: [ActivityType; 4] = [Self::Hiking, Self::Running, Self::Biking, Self::Skiing];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hiking => "Hiking",
            Self::Running => "Running",
            Self::Biking => "Biking",
            Self::Skiing => "Skiing",
        }
    }

    /// Marker and trail color, as understood by the map's marker icons.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Hiking => "green",
            Self::Running => "orange",
            Self::Biking => "red",
            Self::Skiing => "blue",
        }
    }

    /// Font Awesome icon name, without the `fa-` prefix.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Hiking => "person-hiking",
            Self::Running => "person-running",
            Self::Biking => "person-biking",
            Self::Skiing => "person-skiing",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivityType {
    type Err = UnknownActivityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownActivityType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directory_names() {
        assert_eq!("Biking".parse::<ActivityType>(), Ok(ActivityType::Biking));
        assert_eq!("Skiing".parse::<ActivityType>(), Ok(ActivityType::Skiing));
        assert!("hiking".parse::<ActivityType>().is_err());
        let err = "Swimming".parse::<ActivityType>().unwrap_err();
        assert_eq!(err, UnknownActivityType("Swimming".into()));
        assert_eq!(err.to_string(), "unknown activity type 'Swimming'");
    }

    #[test]
    fn every_type_has_distinct_style() {
        let colors: std::collections::HashSet<_> =
            ActivityType::ALL.iter().map(|t| t.color()).collect();
        assert_eq!(colors.len(), ActivityType::ALL.len());
        assert_eq!(ActivityType::Running.icon(), "person-running");
        assert_eq!(ActivityType::Hiking.to_string(), "Hiking");
    }
}
