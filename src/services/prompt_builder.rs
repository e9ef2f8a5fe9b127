//! Builds the grounding prompt for one batch of days.
//!
//! The prompt is the whole contract with the model: it lists the only places
//! that may be used, fixes the day header and spot line format the parser
//! reads back, and gives a time-slot skeleton per day.

use chrono::{Duration, NaiveDate};
use std::fmt::Write;

use crate::models::preference::{age_group_hint, TripPlan};
use crate::services::place_aggregation_service::CandidatePool;

/// `(time, slot hint)` for every day
pub const DAY_SKELETON: [(&str, &str); 7] = [
    ("08:00", "아침식사 장소(식당)"),
    ("10:00", "오전 관광지"),
    ("12:30", "점심식사 장소(식당)"),
    ("14:00", "오후 관광지 또는 체험"),
    ("16:00", "카페 또는 휴식 장소"),
    ("18:00", "저녁식사 장소(식당)"),
    ("20:00", "야간 관광지"),
];

/// Consecutive days handled by one completion. `first_day` is the 1-based
/// position of `start_date` within the whole trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub first_day: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DayRange {
    pub fn len(&self) -> usize {
        ((self.end_date - self.start_date).num_days() + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end_date < self.start_date
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.len()).map(move |i| self.start_date + Duration::days(i as i64))
    }

    /// Split `start..=end` into ranges of at most `batch_days` days.
    pub fn split(start_date: NaiveDate, end_date: NaiveDate, batch_days: usize) -> Vec<DayRange> {
        let batch_days = batch_days.max(1);
        let mut ranges = Vec::new();
        let mut first_day = 1;
        let mut cursor = start_date;

        while cursor <= end_date {
            let batch_end = (cursor + Duration::days(batch_days as i64 - 1)).min(end_date);
            ranges.push(DayRange {
                first_day,
                start_date: cursor,
                end_date: batch_end,
            });
            first_day += batch_days;
            cursor = batch_end + Duration::days(1);
        }

        ranges
    }
}

pub fn build_prompt(plan: &TripPlan, candidates: &CandidatePool, range: &DayRange) -> String {
    let mut prompt = String::new();
    let area_list = plan.areas.join(", ");

    // Writing into a String cannot fail.
    let _ = writeln!(
        prompt,
        "당신은 {} {} 지역 전문 여행 플래너입니다.",
        plan.region, area_list
    );
    let _ = writeln!(
        prompt,
        "{}부터 {}까지 {}일간의 여행 일정을 만들어주세요.\n",
        range.start_date.format("%Y-%m-%d"),
        range.end_date.format("%Y-%m-%d"),
        range.len()
    );

    prompt.push_str("여행객 정보:\n");
    if plan.age_groups.is_empty() {
        let _ = writeln!(prompt, "- 연령대: 제한 없음 ({})", age_group_hint(""));
    }
    for age_group in &plan.age_groups {
        let _ = writeln!(prompt, "- 연령대: {} ({})", age_group, age_group_hint(age_group));
    }
    let travelers: Vec<String> = plan
        .travelers
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(label, count)| format!("{}: {}명", label, count))
        .collect();
    if !travelers.is_empty() {
        let _ = writeln!(prompt, "- 인원: {}", travelers.join(", "));
    }

    prompt.push_str("\n사용 가능한 장소 목록 (이 목록에 있는 장소만 사용하세요):\n");
    for (category, places) in candidates {
        if places.is_empty() {
            continue;
        }
        let _ = writeln!(prompt, "[{}]", category.label());
        for place in places {
            let _ = writeln!(prompt, "- {} ({})", place.name, place.simplified_address);
        }
    }

    prompt.push_str(
        "\n규칙:\n\
         1. 위 목록에 없는 장소는 절대 만들어내지 마세요.\n\
         2. 장소명과 주소는 목록에 적힌 그대로 사용하세요.\n\
         3. 하루에 3~7개의 장소를 배치하고, 같은 장소를 두 번 사용하지 마세요.\n\
         4. 각 날짜는 반드시 'N일차 (YYYY-MM-DD)' 형식의 제목으로 시작하세요.\n\
         5. 장소명에 [관광지], [맛집] 같은 카테고리 표시를 붙이지 마세요.\n\
         6. 각 장소는 'HH:MM 장소명 - 주소 - 설명' 형식으로 한 줄에 작성하세요.\n\
         7. 이동 시간이 짧도록 가까운 장소끼리 묶어주세요.\n",
    );

    prompt.push_str("\n다음 형식으로 일정을 작성해주세요:\n");
    for (offset, date) in range.dates().enumerate() {
        let _ = writeln!(
            prompt,
            "\n{}일차 ({})",
            range.first_day + offset,
            date.format("%Y-%m-%d")
        );
        for (time, hint) in DAY_SKELETON {
            let _ = writeln!(prompt, "{} {} - 주소 - 설명", time, hint);
        }
    }

    if plan.total_days() > 1 {
        prompt.push_str("\n숙소는 [숙소] 목록에서만 골라 일정 마지막 설명에 함께 적어주세요.\n");
    }

    prompt
}
