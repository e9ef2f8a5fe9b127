use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use crate::services::course_generation_service::CourseGenerator;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

impl ServiceStatus {
    fn ok(details: String) -> Self {
        Self {
            status: "ok".to_string(),
            details: Some(details),
        }
    }

    fn error(details: &str) -> Self {
        Self {
            status: "error".to_string(),
            details: Some(details.to_string()),
        }
    }
}

pub async fn health_check(generator: web::Data<Arc<CourseGenerator>>) -> impl Responder {
    let aggregator = generator.aggregator();
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    health.services.insert(
        "cache".to_string(),
        ServiceStatus::ok(format!("{} cache", aggregator.cache_backend())),
    );

    let providers = aggregator.search_provider_names();
    let search = if providers.is_empty() {
        ServiceStatus::error("No place search provider configured")
    } else {
        ServiceStatus::ok(providers.join(", "))
    };
    health.services.insert("place_search".to_string(), search.clone());

    let geocoding = match aggregator.geocoder_name() {
        Some(name) => ServiceStatus::ok(name.to_string()),
        None => ServiceStatus::error("No geocoder configured, routes will not be optimized"),
    };
    health.services.insert("geocoding".to_string(), geocoding);

    health.services.insert(
        "llm".to_string(),
        ServiceStatus::ok(generator.llm_model().to_string()),
    );

    // Without a search provider no course can be produced
    if search.status != "ok" {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}
