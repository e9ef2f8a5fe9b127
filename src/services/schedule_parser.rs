//! Reads a model-written schedule back into a [`TravelCourse`].
//!
//! The text follows the template the prompt asks for:
//!
//! ```text
//! 1일차 (2024-05-01)
//! 08:00 장소명 - 주소 - 설명
//! ```
//!
//! Parsing runs in two stages: the text is cut into day sections at each day
//! header, then every section is scanned for spot records (a line starting with
//! `HH:MM` plus any untimed lines after it). Each record is matched against
//! the candidate list and only candidates not yet in the [`UsageTracker`] are
//! accepted. Anything that does not fit is dropped, never guessed at.

use chrono::{Duration, NaiveDate, NaiveTime};
use log::{debug, warn};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::course::{TravelCourse, TravelDay, TravelSpot};
use crate::models::place::Place;
use crate::services::usage_tracker::UsageTracker;

static DAY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:#+\s*)?(?:\*\*)?(\d+)일차\s*\(([^)]*)\)(.*)$").expect("valid day header pattern")
});

static SPOT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*]\s+)?(\d{2}:\d{2})\s+(.+)$").expect("valid spot line pattern")
});

static SEGMENT_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+-\s+").expect("valid separator pattern"));

static LEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]]*\]\s*").expect("valid tag pattern"));

pub const TAG_KEYWORDS: [&str; 8] = ["맛집", "관광", "문화", "쇼핑", "자연", "휴식", "체험", "역사"];
pub const DEFAULT_TAG: &str = "추천 코스";

#[derive(Debug)]
struct DaySection<'a> {
    date_token: &'a str,
    lines: Vec<&'a str>,
}

#[derive(Debug, PartialEq)]
struct SpotRecord {
    time: NaiveTime,
    name: String,
    address: String,
    description: String,
}

/// Parse `text` into days within `start_date..=end_date`, scheduling only
/// places from `candidates` that `tracker` has not seen. Accepted names are
/// added to `tracker`.
pub fn parse(
    text: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    candidates: &[Place],
    tracker: &mut UsageTracker,
) -> TravelCourse {
    let mut days: Vec<TravelDay> = Vec::new();
    let mut seen_dates: HashSet<NaiveDate> = HashSet::new();

    for (index, section) in split_days(text).into_iter().enumerate() {
        let date = match section_date(section.date_token) {
            Some(date) => date,
            None => {
                let fallback = start_date + Duration::days(index as i64);
                debug!(
                    "Unreadable day date '{}', using {}",
                    section.date_token, fallback
                );
                fallback
            }
        };

        if date < start_date || date > end_date {
            warn!("Dropping day {} outside {}..={}", date, start_date, end_date);
            continue;
        }
        if !seen_dates.insert(date) {
            warn!("Dropping repeated day {}", date);
            continue;
        }

        let mut day = TravelDay::new(date);
        for record in spot_records(&section.lines) {
            match match_candidate(&record.name, candidates, tracker) {
                Some(place) => {
                    tracker.mark_used(place.name.clone());
                    day.spots
                        .push(TravelSpot::from_candidate(place, record.time, record.description));
                }
                None => debug!(
                    "No unused candidate for '{}' ({}) on {}",
                    record.name, record.address, date
                ),
            }
        }

        if day.spots.is_empty() {
            warn!("Day {} has no matched spots", date);
        }
        days.push(day);
    }

    days.sort_by_key(|day| day.date);

    TravelCourse {
        days,
        tags: extract_tags(text),
    }
}

/// Stage one: cut the text at day headers. Text before the first header is
/// ignored.
fn split_days(text: &str) -> Vec<DaySection<'_>> {
    let mut sections: Vec<DaySection> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = DAY_HEADER.captures(line) {
            let date_token = caps.get(2).map_or("", |m| m.as_str());
            sections.push(DaySection {
                date_token,
                lines: Vec::new(),
            });
            // free text after the date belongs to the body
            if let Some(rest) = caps.get(3).map(|m| m.as_str().trim()).filter(|r| !r.is_empty()) {
                if let Some(section) = sections.last_mut() {
                    section.lines.push(rest);
                }
            }
        } else if let Some(section) = sections.last_mut() {
            section.lines.push(line);
        }
    }

    sections
}

fn section_date(token: &str) -> Option<NaiveDate> {
    let date_only: String = token.trim().chars().take(10).collect();
    NaiveDate::parse_from_str(&date_only, "%Y-%m-%d").ok()
}

/// Stage two: collect spot records from one day body. Lines without a time
/// continue the description of the record before them.
fn spot_records(lines: &[&str]) -> Vec<SpotRecord> {
    let mut raw: Vec<(NaiveTime, String)> = Vec::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = SPOT_LINE.captures(line) {
            let token = &caps[1];
            match NaiveTime::parse_from_str(token, "%H:%M") {
                Ok(time) => raw.push((time, caps[2].trim().to_string())),
                Err(_) => debug!("Dropping line with invalid time '{}'", token),
            }
            continue;
        }

        if let Some((_, body)) = raw.last_mut() {
            body.push(' ');
            body.push_str(line);
        }
    }

    raw.into_iter()
        .filter_map(|(time, body)| {
            let record = split_record(time, &body);
            if record.is_none() {
                debug!("Dropping spot line without name/address/description: '{}'", body);
            }
            record
        })
        .collect()
}

fn split_record(time: NaiveTime, body: &str) -> Option<SpotRecord> {
    let segments: Vec<&str> = SEGMENT_SEPARATOR.splitn(body, 3).collect();
    if segments.len() < 3 {
        return None;
    }

    Some(SpotRecord {
        time,
        name: clean_name(segments[0]),
        address: segments[1].trim().to_string(),
        description: segments[2].trim().to_string(),
    })
}

/// Drop `**` emphasis and a leading `[tag]`.
fn clean_name(raw: &str) -> String {
    let unemphasized = raw.replace("**", "");
    LEADING_TAG.replace(unemphasized.trim(), "").trim().to_string()
}

/// First unused candidate whose name contains, or is contained in, `name`.
fn match_candidate<'a>(name: &str, candidates: &'a [Place], tracker: &UsageTracker) -> Option<&'a Place> {
    if name.is_empty() {
        return None;
    }

    candidates.iter().find(|place| {
        !tracker.contains(&place.name) && (place.name.contains(name) || name.contains(place.name.as_str()))
    })
}

pub fn extract_tags(text: &str) -> Vec<String> {
    let tags: Vec<String> = TAG_KEYWORDS
        .iter()
        .filter(|keyword| text.contains(**keyword))
        .map(|keyword| keyword.to_string())
        .collect();

    if tags.is_empty() {
        vec![DEFAULT_TAG.to_string()]
    } else {
        tags
    }
}
