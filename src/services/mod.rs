pub mod course_generation_service;
pub mod kakao_local_service;
pub mod llm_service;
pub mod place_aggregation_service;
pub mod place_search_service;
pub mod prompt_builder;
pub mod route_optimization_service;
pub mod schedule_parser;
pub mod usage_tracker;
