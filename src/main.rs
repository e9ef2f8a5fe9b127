use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};

use travel_course_api::config::{AggregatorConfig, AppConfig, GenerationConfig};
use travel_course_api::db::cache::{CacheStore, MemoryCacheStore, MongoCacheStore};
use travel_course_api::db::mongo::create_mongo_client;
use travel_course_api::db::place_cache::PlaceCache;
use travel_course_api::routes;
use travel_course_api::services::course_generation_service::CourseGenerator;
use travel_course_api::services::kakao_local_service::KakaoLocalService;
use travel_course_api::services::llm_service::{CompletionClient, OpenAiClient};
use travel_course_api::services::place_aggregation_service::PlaceAggregator;
use travel_course_api::services::place_search_service::{
    GeocodingProvider, NaverLocalSearch, PlaceSearchProvider,
};

async fn build_cache_store(config: &AppConfig) -> Arc<dyn CacheStore> {
    let Some(uri) = &config.mongodb_uri else {
        warn!("MONGODB_URI not set, using in-process place cache");
        return Arc::new(MemoryCacheStore::new());
    };

    match create_mongo_client(uri).await {
        Ok(client) => {
            let store = MongoCacheStore::new(client);
            if let Err(e) = store.ensure_ttl_index().await {
                warn!("Could not create cache TTL index: {}", e);
            }
            Arc::new(store)
        }
        Err(e) => {
            error!("MongoDB unavailable ({}), using in-process place cache", e);
            Arc::new(MemoryCacheStore::new())
        }
    }
}

fn build_providers(
    config: &AppConfig,
) -> io::Result<(Vec<Arc<dyn PlaceSearchProvider>>, Option<Arc<dyn GeocodingProvider>>)> {
    let mut search_providers: Vec<Arc<dyn PlaceSearchProvider>> = Vec::new();
    let mut geocoder: Option<Arc<dyn GeocodingProvider>> = None;

    if let (Some(id), Some(secret)) = (&config.naver_client_id, &config.naver_client_secret) {
        let naver = NaverLocalSearch::new(id.clone(), secret.clone()).map_err(io::Error::other)?;
        search_providers.push(Arc::new(naver));
        info!("Naver local search enabled");
    }

    if let Some(key) = &config.kakao_rest_api_key {
        let kakao = Arc::new(KakaoLocalService::new(key.clone()).map_err(io::Error::other)?);
        search_providers.push(kakao.clone());
        geocoder = Some(kakao as Arc<dyn GeocodingProvider>);
        info!("Kakao local search and geocoding enabled");
    }

    if search_providers.is_empty() {
        return Err(io::Error::other(
            "no place search provider configured (set NAVER_CLIENT_ID/NAVER_CLIENT_SECRET or KAKAO_REST_API_KEY)",
        ));
    }
    if geocoder.is_none() {
        warn!("No geocoder configured, routes will not be optimized");
    }

    Ok((search_providers, geocoder))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env();
    let aggregator_config = AggregatorConfig::from_env();
    let generation_config = GenerationConfig::from_env();

    let (search_providers, geocoder) = build_providers(&config)?;

    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| io::Error::other("OPENAI_API_KEY must be set"))?;
    let llm: Arc<dyn CompletionClient> = Arc::new(
        OpenAiClient::new(api_key, config.openai_model.clone(), config.openai_base_url.clone())
            .map_err(io::Error::other)?,
    );

    let store = build_cache_store(&config).await;
    let cache = PlaceCache::new(store, aggregator_config.cache_ttl);
    let aggregator = PlaceAggregator::new(search_providers, geocoder, cache, aggregator_config);
    let generator = Arc::new(CourseGenerator::new(aggregator, llm, generation_config));

    let allowed_origin = config.cors_allowed_origin.clone();
    info!("Starting HTTP server on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(generator.clone()))
            .configure(routes::configure)
    })
    .bind((config.host.clone(), config.port))?
    .run()
    .await
}
