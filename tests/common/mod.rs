#![allow(dead_code)]

use actix_web::{web, App};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use travel_course_api::config::{AggregatorConfig, GenerationConfig};
use travel_course_api::db::cache::MemoryCacheStore;
use travel_course_api::db::place_cache::PlaceCache;
use travel_course_api::errors::{LlmError, ProviderError};
use travel_course_api::models::place::Coordinates;
use travel_course_api::models::preference::TravelPreference;
use travel_course_api::routes;
use travel_course_api::services::course_generation_service::CourseGenerator;
use travel_course_api::services::llm_service::{CompletionClient, CompletionRequest};
use travel_course_api::services::place_aggregation_service::PlaceAggregator;
use travel_course_api::services::place_search_service::{PlaceHit, PlaceSearchProvider};

/// Search provider answering exact queries from a table.
#[derive(Default)]
pub struct ScriptedSearch {
    responses: HashMap<String, Vec<PlaceHit>>,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, hits: Vec<PlaceHit>) -> Self {
        self.responses.insert(query.to_string(), hits);
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl PlaceSearchProvider for ScriptedSearch {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn search(&self, query: &str, _display: u32) -> Result<Vec<PlaceHit>, ProviderError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.responses.get(query).cloned().unwrap_or_default())
    }
}

/// `count` geocoded hits named `{prefix}01`, `{prefix}02`, ... in 서울 종로구.
pub fn jongno_hits(prefix: &str, count: usize) -> Vec<PlaceHit> {
    (1..=count)
        .map(|i| PlaceHit {
            title: format!("<b>{}{:02}</b>", prefix, i),
            address: format!("서울특별시 종로구 관철동 {}", i),
            road_address: format!("서울특별시 종로구 종로 {}", i),
            coordinates: Some(Coordinates::new(37.57 + i as f64 * 0.001, 126.98)),
        })
        .collect()
}

/// Completion fake that writes a schedule for every day header in the
/// prompt's skeleton, using the listed candidates in order.
pub struct PromptEchoLlm {
    spots_per_day: usize,
    pub prompts: Mutex<Vec<String>>,
}

impl PromptEchoLlm {
    pub fn new(spots_per_day: usize) -> Self {
        Self {
            spots_per_day,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn reply(&self, prompt: &str) -> String {
        let header = Regex::new(r"^(\d+)일차 \((\d{4}-\d{2}-\d{2})\)$").unwrap();
        let candidate = Regex::new(r"^- (.+) \((.*)\)$").unwrap();

        let mut names = prompt
            .lines()
            .skip_while(|line| !line.starts_with("사용 가능한 장소 목록"))
            .take_while(|line| !line.starts_with("규칙:"))
            .filter_map(|line| candidate.captures(line))
            .map(|caps| (caps[1].to_string(), caps[2].to_string()));

        let times = ["09:00", "13:00", "18:30", "20:00"];
        let mut text = String::new();
        for line in prompt.lines() {
            let Some(caps) = header.captures(line) else {
                continue;
            };
            text.push_str(&format!("{}일차 ({})\n", &caps[1], &caps[2]));
            for time in times.iter().take(self.spots_per_day) {
                if let Some((name, address)) = names.next() {
                    text.push_str(&format!("{} {} - {} - 역사와 문화가 있는 곳\n", time, name, address));
                }
            }
        }
        text
    }
}

#[async_trait]
impl CompletionClient for PromptEchoLlm {
    fn model(&self) -> &str {
        "prompt-echo"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(self.reply(&request.prompt))
    }
}

/// Always answers with the same text.
pub struct FixedLlm(pub String);

#[async_trait]
impl CompletionClient for FixedLlm {
    fn model(&self) -> &str {
        "fixed"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
        Ok(self.0.clone())
    }
}

pub fn generator(search: Arc<ScriptedSearch>, llm: Arc<dyn CompletionClient>) -> CourseGenerator {
    let aggregator_config = AggregatorConfig {
        geocode_delay: Duration::ZERO,
        ..AggregatorConfig::default()
    };
    let cache = PlaceCache::new(Arc::new(MemoryCacheStore::new()), aggregator_config.cache_ttl);
    let aggregator = PlaceAggregator::new(
        vec![search as Arc<dyn PlaceSearchProvider>],
        None,
        cache,
        aggregator_config,
    );

    let generation_config = GenerationConfig {
        batch_delay: Duration::ZERO,
        ..GenerationConfig::default()
    };
    CourseGenerator::new(aggregator, llm, generation_config)
}

pub fn preference(region: &str, areas: &[&str], start: &str, end: &str) -> TravelPreference {
    TravelPreference {
        region: region.to_string(),
        areas: areas.iter().map(|a| a.to_string()).collect(),
        start_date: start.to_string(),
        end_date: end.to_string(),
        age_groups: vec!["30대".to_string()],
        age_group: None,
        travelers: [("성인".to_string(), 2)].into_iter().collect(),
    }
}

pub fn create_app(
    generator: Arc<CourseGenerator>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(generator))
        .configure(routes::configure)
}
