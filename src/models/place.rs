use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceCategory {
    Attraction,
    Restaurant,
    Cafe,
    Activity,
    Lodging,
}

impl PlaceCategory {
    pub const ALL: [PlaceCategory; 5] = [
        PlaceCategory::Attraction,
        PlaceCategory::Restaurant,
        PlaceCategory::Cafe,
        PlaceCategory::Activity,
        PlaceCategory::Lodging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceCategory::Attraction => "attraction",
            PlaceCategory::Restaurant => "restaurant",
            PlaceCategory::Cafe => "cafe",
            PlaceCategory::Activity => "activity",
            PlaceCategory::Lodging => "lodging",
        }
    }

    /// Heading used when listing candidates in a prompt
    pub fn label(&self) -> &'static str {
        match self {
            PlaceCategory::Attraction => "관광지",
            PlaceCategory::Restaurant => "식당",
            PlaceCategory::Cafe => "카페",
            PlaceCategory::Activity => "체험",
            PlaceCategory::Lodging => "숙소",
        }
    }

    /// Keyword phrasings sent to the place-search providers
    pub fn search_keywords(&self) -> &'static [&'static str] {
        match self {
            PlaceCategory::Attraction => &["관광지", "명소"],
            PlaceCategory::Restaurant => &["맛집"],
            PlaceCategory::Cafe => &["카페"],
            PlaceCategory::Activity => &["체험", "액티비티"],
            PlaceCategory::Lodging => &["숙소", "호텔"],
        }
    }
}

impl fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate place returned by aggregation, before it is scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub simplified_address: String,
    pub category: PlaceCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Place {
    pub fn new(name: impl Into<String>, address: impl Into<String>, category: PlaceCategory) -> Self {
        let address = address.into();
        Self {
            name: name.into(),
            simplified_address: simplify_address(&address),
            address,
            category,
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }
}

/// First three whitespace-separated tokens of an address.
pub fn simplify_address(address: &str) -> String {
    address
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}
