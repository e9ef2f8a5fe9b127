use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::CourseError;

/// Longest trip one request may plan.
pub const MAX_TRIP_DAYS: i64 = 30;

static LOCAL_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[가-힣]+(?:\s+[가-힣]+)*$").expect("valid region pattern"));

/// Body of a course request as the front end sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPreference {
    pub region: String,
    #[serde(default)]
    pub areas: Vec<String>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub age_groups: Vec<String>,
    /// Older clients send a single age group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
    /// Traveler label -> head count, e.g. "성인" -> 2
    #[serde(default)]
    pub travelers: BTreeMap<String, u32>,
}

/// A request that passed validation; nothing external has been called yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TripPlan {
    pub region: String,
    pub areas: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub age_groups: Vec<String>,
    pub travelers: BTreeMap<String, u32>,
}

impl TripPlan {
    pub fn total_days(&self) -> usize {
        ((self.end_date - self.start_date).num_days() + 1) as usize
    }
}

impl TravelPreference {
    pub fn validate(&self) -> Result<TripPlan, CourseError> {
        let region = self.region.trim();
        if !LOCAL_SCRIPT.is_match(region) {
            return Err(CourseError::InvalidInput(format!(
                "region must be written in Hangul: '{}'",
                self.region
            )));
        }

        let areas: Vec<String> = self
            .areas
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if areas.is_empty() || areas.len() != self.areas.len() {
            return Err(CourseError::InvalidInput(
                "at least one area is required and areas may not be blank".to_string(),
            ));
        }

        let start_date = parse_request_date(&self.start_date)?;
        let end_date = parse_request_date(&self.end_date)?;
        if end_date < start_date {
            return Err(CourseError::InvalidInput(format!(
                "end date {} is before start date {}",
                end_date, start_date
            )));
        }
        let days = (end_date - start_date).num_days() + 1;
        if days > MAX_TRIP_DAYS {
            return Err(CourseError::InvalidInput(format!(
                "trip of {} days exceeds the {}-day limit",
                days, MAX_TRIP_DAYS
            )));
        }

        let mut age_groups = self.age_groups.clone();
        if let Some(single) = &self.age_group {
            if !age_groups.contains(single) {
                age_groups.push(single.clone());
            }
        }

        Ok(TripPlan {
            region: region.to_string(),
            areas,
            start_date,
            end_date,
            age_groups,
            travelers: self.travelers.clone(),
        })
    }
}

/// Accepts `YYYY-MM-DD`, dropping any `T...` time suffix.
pub fn parse_request_date(value: &str) -> Result<NaiveDate, CourseError> {
    let date_part = value.trim().split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| CourseError::InvalidInput(format!("invalid date '{}': {}", value, e)))
}

/// Preference hint shown to the model for an age group.
pub fn age_group_hint(age_group: &str) -> &'static str {
    match age_group {
        "10대" => "트렌디한 장소, 인스타감성의 카페, 즐거운 액티비티",
        "20대" => "핫플레이스, SNS 맛집, 분위기 좋은 카페",
        "30대" => "여유로운 관광, 맛집 탐방, 문화예술 공간",
        "40대" => "편안한 관광지, 전통 맛집, 역사문화 명소",
        "50대" => "자연 명소, 건강식당, 전통시장",
        "60대" | "60대 이상" | "70대" | "80대" => "접근성 좋은 관광지, 편한 식당, 휴식공간",
        _ => "일반적인 선호",
    }
}
