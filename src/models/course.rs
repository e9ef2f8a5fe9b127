use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::place::{Coordinates, Place, PlaceCategory};

// Times travel as "HH:MM" on the wire.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&value, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelSpot {
    pub name: String,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub address: String,
    pub description: String,
    pub category: PlaceCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<String>>,
}

impl TravelSpot {
    /// Schedule a candidate. Name, address and coordinates always come from
    /// the candidate, never from model text.
    pub fn from_candidate(place: &Place, time: NaiveTime, description: impl Into<String>) -> Self {
        Self {
            name: place.name.clone(),
            time,
            address: place.address.clone(),
            description: description.into(),
            category: place.category,
            coordinates: place.coordinates,
            reviews: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelDay {
    pub date: NaiveDate,
    pub spots: Vec<TravelSpot>,
}

impl TravelDay {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            spots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelCourse {
    pub days: Vec<TravelDay>,
    pub tags: Vec<String>,
}

impl TravelCourse {
    pub fn spot_count(&self) -> usize {
        self.days.iter().map(|d| d.spots.len()).sum()
    }

    /// Append another partial course, keeping tags unique and in first-seen order.
    pub fn merge(&mut self, other: TravelCourse) {
        self.days.extend(other.days);
        for tag in other.tags {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }
}
