//! Course Generation Service
//!
//! Drives one course request end to end:
//! validate → aggregate candidates → per batch of days: prompt → completion →
//! parse → optimize routes → merge.
//!
//! One [`UsageTracker`] lives for the whole request and is threaded through
//! every batch, so later batches never reschedule places chosen earlier
//! (until the tracker is reset because most of the pool has been used).

use log::{info, warn};
use std::sync::Arc;
use tokio::time::sleep;
use uuid::Uuid;

use crate::config::GenerationConfig;
use crate::errors::CourseError;
use crate::models::course::TravelCourse;
use crate::models::place::Place;
use crate::models::preference::{TravelPreference, TripPlan};
use crate::services::llm_service::{CompletionClient, CompletionRequest, SYSTEM_PROMPT};
use crate::services::place_aggregation_service::{pool_size, CandidatePool, PlaceAggregator};
use crate::services::prompt_builder::{build_prompt, DayRange};
use crate::services::route_optimization_service::RouteOptimizer;
use crate::services::schedule_parser;
use crate::services::usage_tracker::UsageTracker;

pub struct CourseGenerator {
    aggregator: PlaceAggregator,
    llm: Arc<dyn CompletionClient>,
    route_optimizer: RouteOptimizer,
    config: GenerationConfig,
}

impl CourseGenerator {
    pub fn new(aggregator: PlaceAggregator, llm: Arc<dyn CompletionClient>, config: GenerationConfig) -> Self {
        Self {
            aggregator,
            llm,
            route_optimizer: RouteOptimizer::new(),
            config,
        }
    }

    pub fn aggregator(&self) -> &PlaceAggregator {
        &self.aggregator
    }

    pub fn llm_model(&self) -> &str {
        self.llm.model()
    }

    pub async fn generate(&self, preference: &TravelPreference) -> Result<TravelCourse, CourseError> {
        let plan = preference.validate()?;
        let request_id = Uuid::new_v4();

        info!(
            "[{}] Generating {}-day course for {} {:?} ({} ~ {})",
            request_id,
            plan.total_days(),
            plan.region,
            plan.areas,
            plan.start_date,
            plan.end_date
        );

        let pool = self.aggregator.search_all(&plan.region, &plan.areas).await;
        if pool_size(&pool) == 0 {
            warn!("[{}] No candidates for {} {:?}", request_id, plan.region, plan.areas);
            return Err(CourseError::NoCandidates {
                region: plan.region,
                areas: plan.areas,
            });
        }

        let course = self.generate_from_pool(&plan, &pool).await?;

        info!(
            "[{}] Finished: {} days, {} spots, tags {:?}",
            request_id,
            course.days.len(),
            course.spot_count(),
            course.tags
        );
        Ok(course)
    }

    /// Batch loop over an already aggregated pool.
    pub async fn generate_from_pool(&self, plan: &TripPlan, pool: &CandidatePool) -> Result<TravelCourse, CourseError> {
        let total_pool = pool_size(pool);
        let ranges = DayRange::split(plan.start_date, plan.end_date, self.config.batch_days);
        let mut tracker = UsageTracker::new();
        let mut course = TravelCourse::default();

        for (index, range) in ranges.iter().enumerate() {
            if index > 0 && !self.config.batch_delay.is_zero() {
                sleep(self.config.batch_delay).await;
            }

            info!(
                "Batch {}/{}: {} ~ {}",
                index + 1,
                ranges.len(),
                range.start_date,
                range.end_date
            );
            let batch = self.run_batch(plan, pool, range, &mut tracker).await;
            course.merge(batch);

            if tracker.exceeds(total_pool, self.config.usage_reset_ratio) {
                info!(
                    "Used {} of {} candidates, resetting usage tracker",
                    tracker.len(),
                    total_pool
                );
                tracker.clear();
            }
        }

        if course.days.is_empty() {
            return Err(CourseError::GenerationFailed(
                "no day could be read from the generated schedule".to_string(),
            ));
        }

        let expected = plan.total_days();
        if course.days.len() < expected {
            warn!(
                "Recovered {} of {} days, returning partial course",
                course.days.len(),
                expected
            );
        }

        Ok(course)
    }

    /// One batch with bounded retries. The attempt with the most matched spots
    /// wins and the tracker ends up holding exactly that attempt's names.
    async fn run_batch(
        &self,
        plan: &TripPlan,
        pool: &CandidatePool,
        range: &DayRange,
        tracker: &mut UsageTracker,
    ) -> TravelCourse {
        let available = unused_candidates(pool, tracker, self.config.max_candidates_per_category);
        let candidates: Vec<Place> = available.values().flatten().cloned().collect();
        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: build_prompt(plan, &available, range),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let snapshot = tracker.clone();
        let mut best: Option<(TravelCourse, UsageTracker)> = None;

        for attempt in 0..=self.config.batch_retries {
            if attempt > 0 {
                warn!("Retrying batch {} ~ {} (attempt {})", range.start_date, range.end_date, attempt + 1);
                *tracker = snapshot.clone();
            }

            let text = match self.llm.complete(request.clone()).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Completion failed for {} ~ {}: {}", range.start_date, range.end_date, e);
                    continue;
                }
            };

            let mut parsed = schedule_parser::parse(&text, range.start_date, range.end_date, &candidates, tracker);
            parsed.days = parsed
                .days
                .into_iter()
                .map(|day| self.route_optimizer.optimize(day))
                .collect();

            let complete = parsed.days.len() == range.len() && parsed.days.iter().all(|d| !d.spots.is_empty());
            let improved = best
                .as_ref()
                .map_or(true, |(kept, _)| parsed.spot_count() > kept.spot_count());
            if improved {
                best = Some((parsed, tracker.clone()));
            }
            if complete {
                break;
            }
        }

        match best {
            Some((course, used)) => {
                *tracker = used;
                course
            }
            None => {
                *tracker = snapshot;
                TravelCourse::default()
            }
        }
    }
}

/// Per category: places not yet used, capped to the first `limit` in
/// relevance order.
pub fn unused_candidates(pool: &CandidatePool, tracker: &UsageTracker, limit: usize) -> CandidatePool {
    pool.iter()
        .map(|(category, places)| {
            let available = places
                .iter()
                .filter(|place| !tracker.contains(&place.name))
                .take(limit)
                .cloned()
                .collect();
            (*category, available)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregatorConfig;
    use crate::db::cache::MemoryCacheStore;
    use crate::db::place_cache::PlaceCache;
    use crate::errors::LlmError;
    use crate::models::place::PlaceCategory;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::{BTreeMap, VecDeque};
    use std::time::Duration;
    use tokio::sync::Mutex;

    struct QueuedCompletions {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl QueuedCompletions {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for QueuedCompletions {
        fn model(&self) -> &str {
            "queued"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            self.prompts.lock().await.push(request.prompt);
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyCompletion))
        }
    }

    fn generator(llm: Arc<dyn CompletionClient>) -> CourseGenerator {
        generator_with(
            llm,
            GenerationConfig {
                batch_delay: Duration::ZERO,
                ..GenerationConfig::default()
            },
        )
    }

    fn generator_with(llm: Arc<dyn CompletionClient>, config: GenerationConfig) -> CourseGenerator {
        let aggregator = PlaceAggregator::new(
            vec![],
            None,
            PlaceCache::new(Arc::new(MemoryCacheStore::new()), Duration::from_secs(60)),
            AggregatorConfig::default(),
        );
        CourseGenerator::new(aggregator, llm, config)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn plan(start: &str, end: &str) -> TripPlan {
        TripPlan {
            region: "서울".to_string(),
            areas: vec!["종로구".to_string()],
            start_date: date(start),
            end_date: date(end),
            age_groups: vec![],
            travelers: BTreeMap::new(),
        }
    }

    fn pool(names: &[&str]) -> CandidatePool {
        let places = names
            .iter()
            .map(|name| Place::new(*name, "서울 종로구 종로 1", PlaceCategory::Attraction))
            .collect();
        BTreeMap::from([(PlaceCategory::Attraction, places)])
    }

    #[test]
    fn test_unused_candidates_filters_and_caps() {
        let mut tracker = UsageTracker::new();
        tracker.mark_used("A");
        let available = unused_candidates(&pool(&["A", "B", "C", "D"]), &tracker, 2);

        let names: Vec<&str> = available[&PlaceCategory::Attraction]
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[actix_rt::test]
    async fn test_empty_day_is_retried_once() {
        let llm = QueuedCompletions::new(vec![
            Ok("1일차 (2024-05-01)\n10:00 없는곳 - 서울 - 설명\n".to_string()),
            Ok("1일차 (2024-05-01)\n10:00 창덕궁 - 서울 종로구 - 후원\n".to_string()),
        ]);
        let course = generator(llm.clone())
            .generate_from_pool(&plan("2024-05-01", "2024-05-01"), &pool(&["창덕궁", "종묘"]))
            .await
            .unwrap();

        assert_eq!(course.days[0].spots.len(), 1);
        assert!(llm.replies.lock().await.is_empty());
    }

    #[actix_rt::test]
    async fn test_failed_retry_keeps_the_better_attempt() {
        let llm = QueuedCompletions::new(vec![
            Ok("1일차 (2024-05-01)\n10:00 창덕궁 - 서울 종로구 - 후원\n2일차 (2024-05-02)\n".to_string()),
            Err(LlmError::EmptyCompletion),
        ]);
        let course = generator(llm)
            .generate_from_pool(&plan("2024-05-01", "2024-05-02"), &pool(&["창덕궁", "종묘", "운현궁"]))
            .await
            .unwrap();

        assert_eq!(course.days.len(), 2);
        assert_eq!(course.spot_count(), 1);
    }

    #[actix_rt::test]
    async fn test_no_readable_day_fails() {
        let llm = QueuedCompletions::new(vec![Ok("일정을 만들 수 없습니다".to_string())]);
        let result = generator(llm)
            .generate_from_pool(&plan("2024-05-01", "2024-05-01"), &pool(&["창덕궁"]))
            .await;

        assert!(matches!(result, Err(CourseError::GenerationFailed(_))));
    }

    #[actix_rt::test]
    async fn test_invalid_request_never_reaches_providers() {
        let llm = QueuedCompletions::new(vec![]);
        let preference = TravelPreference {
            region: "Seoul".to_string(),
            areas: vec!["종로구".to_string()],
            start_date: "2024-05-01".to_string(),
            end_date: "2024-05-01".to_string(),
            age_groups: vec![],
            age_group: None,
            travelers: BTreeMap::new(),
        };

        let result = generator(llm).generate(&preference).await;
        assert!(matches!(result, Err(CourseError::InvalidInput(_))));
    }

    fn one_day_batches() -> GenerationConfig {
        GenerationConfig {
            batch_days: 1,
            batch_delay: Duration::ZERO,
            ..GenerationConfig::default()
        }
    }

    const PALACES: [&str; 5] = ["경복궁", "창덕궁", "종묘", "운현궁", "덕수궁"];

    #[actix_rt::test]
    async fn test_tracker_resets_once_most_of_the_pool_is_used() {
        let llm = QueuedCompletions::new(vec![
            Ok("1일차 (2024-05-01)\n\
                09:00 경복궁 - 서울 종로구 - 궁궐\n\
                11:00 창덕궁 - 서울 종로구 - 후원\n\
                14:00 종묘 - 서울 종로구 - 제례\n\
                16:00 운현궁 - 서울 종로구 - 고택\n"
                .to_string()),
            Ok("2일차 (2024-05-02)\n10:00 경복궁 - 서울 종로구 - 다시 궁궐\n".to_string()),
        ]);
        let course = generator_with(llm.clone(), one_day_batches())
            .generate_from_pool(&plan("2024-05-01", "2024-05-02"), &pool(&PALACES))
            .await
            .unwrap();

        // 4 of 5 used is past 70%, so the second batch sees the whole pool
        let prompts = llm.prompts.lock().await;
        assert_eq!(prompts.len(), 2);
        for name in PALACES {
            assert!(prompts[1].contains(&format!("- {} (", name)), "{} not offered", name);
        }
        assert_eq!(course.days[1].spots[0].name, "경복궁");
    }

    #[actix_rt::test]
    async fn test_tracker_keeps_names_below_reset_ratio() {
        let llm = QueuedCompletions::new(vec![
            Ok("1일차 (2024-05-01)\n\
                09:00 경복궁 - 서울 종로구 - 궁궐\n\
                11:00 창덕궁 - 서울 종로구 - 후원\n\
                14:00 종묘 - 서울 종로구 - 제례\n"
                .to_string()),
            Ok("2일차 (2024-05-02)\n\
                10:00 경복궁 - 서울 종로구 - 다시 궁궐\n\
                13:00 덕수궁 - 서울 중구 - 돌담길\n"
                .to_string()),
        ]);
        let course = generator_with(llm.clone(), one_day_batches())
            .generate_from_pool(&plan("2024-05-01", "2024-05-02"), &pool(&PALACES))
            .await
            .unwrap();

        let prompts = llm.prompts.lock().await;
        for name in ["경복궁", "창덕궁", "종묘"] {
            assert!(!prompts[1].contains(&format!("- {} (", name)), "{} offered again", name);
        }
        assert!(prompts[1].contains("- 운현궁 ("));

        let second_day: Vec<&str> = course.days[1].spots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(second_day, vec!["덕수궁"]);
    }
}
