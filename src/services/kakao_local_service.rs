//! Kakao Local API client
//!
//! Serves both as a place-search provider and as the geocoder. Needs
//! `KAKAO_REST_API_KEY`.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::errors::ProviderError;
use crate::models::place::Coordinates;
use crate::services::place_search_service::{
    check_status, http_client, GeocodingProvider, PlaceHit, PlaceSearchProvider,
};

const KAKAO_KEYWORD_ENDPOINT: &str = "https://dapi.kakao.com/v2/local/search/keyword.json";
const KAKAO_MAX_SIZE: u32 = 15;

#[derive(Debug, Deserialize)]
struct KakaoKeywordResponse {
    #[serde(default)]
    documents: Vec<KakaoDocument>,
}

#[derive(Debug, Deserialize)]
struct KakaoDocument {
    place_name: String,
    #[serde(default)]
    address_name: String,
    #[serde(default)]
    road_address_name: String,
    // Kakao sends coordinates as strings; x is longitude
    #[serde(default)]
    x: String,
    #[serde(default)]
    y: String,
}

impl KakaoDocument {
    fn coordinates(&self) -> Option<Coordinates> {
        let longitude = self.x.parse::<f64>().ok()?;
        let latitude = self.y.parse::<f64>().ok()?;
        Some(Coordinates::new(latitude, longitude))
    }
}

pub struct KakaoLocalService {
    http_client: Client,
    api_key: String,
}

impl KakaoLocalService {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client()?,
            api_key,
        })
    }

    async fn keyword_search(&self, query: &str, size: u32) -> Result<Vec<KakaoDocument>, ProviderError> {
        let size = size.clamp(1, KAKAO_MAX_SIZE).to_string();
        let url = Url::parse_with_params(
            KAKAO_KEYWORD_ENDPOINT,
            &[("query", query), ("size", size.as_str())],
        )
        .map_err(|e| ProviderError::Decode(format!("invalid search url: {}", e)))?;

        debug!("Kakao keyword search: '{}'", query);

        let response = self
            .http_client
            .get(url)
            .header("Authorization", format!("KakaoAK {}", self.api_key))
            .send()
            .await?;

        let body: KakaoKeywordResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("Failed to parse Kakao response: {}", e)))?;

        Ok(body.documents)
    }
}

#[async_trait]
impl PlaceSearchProvider for KakaoLocalService {
    fn name(&self) -> &'static str {
        "kakao"
    }

    async fn search(&self, query: &str, display: u32) -> Result<Vec<PlaceHit>, ProviderError> {
        let documents = self.keyword_search(query, display).await?;
        Ok(documents
            .into_iter()
            .map(|doc| PlaceHit {
                coordinates: doc.coordinates(),
                title: doc.place_name,
                address: doc.address_name,
                road_address: doc.road_address_name,
            })
            .collect())
    }
}

#[async_trait]
impl GeocodingProvider for KakaoLocalService {
    fn name(&self) -> &'static str {
        "kakao"
    }

    async fn geocode(&self, address: &str, name: &str) -> Result<Option<Coordinates>, ProviderError> {
        let query = format!("{} {}", address, name);
        let documents = self.keyword_search(query.trim(), 1).await?;
        Ok(documents.first().and_then(KakaoDocument::coordinates))
    }
}
