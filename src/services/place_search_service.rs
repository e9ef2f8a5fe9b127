//! Place search and geocoding providers
//!
//! The aggregator talks to providers only through [`PlaceSearchProvider`] and
//! [`GeocodingProvider`], so any number of backends can be registered and
//! tests can substitute scripted ones.
//!
//! ## Setup
//! Naver local search needs `NAVER_CLIENT_ID` and `NAVER_CLIENT_SECRET`.
//! The Kakao client lives in `kakao_local_service`.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::models::place::Coordinates;

const NAVER_LOCAL_ENDPOINT: &str = "https://openapi.naver.com/v1/search/local.json";

/// One raw search result. `title` may still contain markup.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceHit {
    pub title: String,
    pub address: String,
    pub road_address: String,
    pub coordinates: Option<Coordinates>,
}

#[async_trait]
pub trait PlaceSearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, display: u32) -> Result<Vec<PlaceHit>, ProviderError>;
}

#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Best single match for a place, or `None` when the provider knows nothing.
    async fn geocode(&self, address: &str, name: &str) -> Result<Option<Coordinates>, ProviderError>;
}

pub(crate) fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder().timeout(Duration::from_secs(10)).build()
}

/// Turn a non-2xx response into [`ProviderError::Status`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, Deserialize)]
struct NaverLocalResponse {
    #[serde(default)]
    items: Vec<NaverLocalItem>,
}

#[derive(Debug, Deserialize)]
struct NaverLocalItem {
    title: String,
    #[serde(default)]
    address: String,
    #[serde(rename = "roadAddress", default)]
    road_address: String,
}

pub struct NaverLocalSearch {
    http_client: Client,
    client_id: String,
    client_secret: String,
}

impl NaverLocalSearch {
    pub fn new(client_id: String, client_secret: String) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client()?,
            client_id,
            client_secret,
        })
    }
}

#[async_trait]
impl PlaceSearchProvider for NaverLocalSearch {
    fn name(&self) -> &'static str {
        "naver"
    }

    async fn search(&self, query: &str, display: u32) -> Result<Vec<PlaceHit>, ProviderError> {
        let display = display.to_string();
        let url = Url::parse_with_params(
            NAVER_LOCAL_ENDPOINT,
            &[("query", query), ("display", display.as_str())],
        )
        .map_err(|e| ProviderError::Decode(format!("invalid search url: {}", e)))?;

        debug!("Naver local search: '{}'", query);

        let response = self
            .http_client
            .get(url)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .send()
            .await?;

        let body: NaverLocalResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("Failed to parse Naver response: {}", e)))?;

        Ok(body
            .items
            .into_iter()
            .map(|item| PlaceHit {
                title: item.title,
                address: item.address,
                road_address: item.road_address,
                coordinates: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naver_response_decoding() {
        let json = r#"{
            "lastBuildDate": "Mon, 01 Jul 2024 10:00:00 +0900",
            "total": 1,
            "items": [{
                "title": "<b>경복궁</b>",
                "link": "",
                "category": "여행,명소>고궁",
                "address": "서울특별시 종로구 세종로 1-91",
                "roadAddress": "서울특별시 종로구 사직로 161",
                "mapx": "1269769",
                "mapy": "375788"
            }]
        }"#;
        let parsed: NaverLocalResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].title, "<b>경복궁</b>");
        assert_eq!(parsed.items[0].road_address, "서울특별시 종로구 사직로 161");
    }

    #[test]
    fn test_naver_response_without_items() {
        let parsed: NaverLocalResponse = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(parsed.items.is_empty());
    }
}
