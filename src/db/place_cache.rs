use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::db::cache::CacheStore;
use crate::models::place::{Coordinates, Place, PlaceCategory};

// Bump when a cached record changes shape so old payloads are never read back.
const KEY_VERSION: &str = "v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPlaces {
    pub places: Vec<Place>,
    pub cached_at: DateTime<Utc>,
}

/// Geocoding answer for one place. `None` means the geocoder knew no match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCoordinates {
    pub coordinates: Option<Coordinates>,
    pub cached_at: DateTime<Utc>,
}

/// Typed view over a [`CacheStore`] for aggregated candidate lists and
/// per-place geocoding results.
#[derive(Clone)]
pub struct PlaceCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl PlaceCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// `places:v1:{region}:{category}:{area...}` with areas sorted so the
    /// same area set always maps to one key.
    pub fn key(region: &str, category: PlaceCategory, areas: &[String]) -> String {
        let mut sorted: Vec<&str> = areas.iter().map(|a| a.trim()).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut segments = vec!["places", KEY_VERSION, region.trim(), category.as_str()];
        segments.extend(sorted);
        segments.join(":")
    }

    /// `coords:v1:{name}:{address}`
    pub fn coordinates_key(name: &str, address: &str) -> String {
        ["coords", KEY_VERSION, name.trim(), address.trim()].join(":")
    }

    pub async fn get(&self, key: &str) -> Option<Vec<Place>> {
        let value = self.store.get(key).await?;
        match serde_json::from_value::<CachedPlaces>(value) {
            Ok(cached) => {
                debug!(
                    "Cache hit for '{}' ({} places, cached at {})",
                    key,
                    cached.places.len(),
                    cached.cached_at
                );
                Some(cached.places)
            }
            Err(e) => {
                warn!("Cached places under '{}' do not match schema: {}", key, e);
                None
            }
        }
    }

    pub async fn set(&self, key: &str, places: &[Place]) {
        let record = CachedPlaces {
            places: places.to_vec(),
            cached_at: Utc::now(),
        };
        match serde_json::to_value(&record) {
            Ok(value) => self.store.set(key, value, self.ttl).await,
            Err(e) => warn!("Failed to serialize places for '{}': {}", key, e),
        }
    }

    /// Outer `None` is a miss, inner `None` a remembered "no match".
    pub async fn get_coordinates(&self, name: &str, address: &str) -> Option<Option<Coordinates>> {
        let key = Self::coordinates_key(name, address);
        let value = self.store.get(&key).await?;
        match serde_json::from_value::<CachedCoordinates>(value) {
            Ok(cached) => Some(cached.coordinates),
            Err(e) => {
                warn!("Cached coordinates under '{}' do not match schema: {}", key, e);
                None
            }
        }
    }

    pub async fn set_coordinates(&self, name: &str, address: &str, coordinates: Option<Coordinates>) {
        let key = Self::coordinates_key(name, address);
        let record = CachedCoordinates {
            coordinates,
            cached_at: Utc::now(),
        };
        match serde_json::to_value(&record) {
            Ok(value) => self.store.set(&key, value, self.ttl).await,
            Err(e) => warn!("Failed to serialize coordinates for '{}': {}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cache::MemoryCacheStore;
    use serde_json::json;

    #[test]
    fn test_key_is_order_independent() {
        let a = PlaceCache::key(
            "서울",
            PlaceCategory::Cafe,
            &["종로구".to_string(), "강남구".to_string()],
        );
        let b = PlaceCache::key(
            "서울",
            PlaceCategory::Cafe,
            &["강남구".to_string(), " 종로구 ".to_string()],
        );
        assert_eq!(a, b);
        assert_eq!(a, "places:v1:서울:cafe:강남구:종로구");
    }

    #[actix_rt::test]
    async fn test_round_trip_through_store() {
        let cache = PlaceCache::new(Arc::new(MemoryCacheStore::new()), Duration::from_secs(60));
        let places = vec![Place::new("경복궁", "서울 종로구 사직로 161", PlaceCategory::Attraction)];

        cache.set("k", &places).await;
        assert_eq!(cache.get("k").await, Some(places));
    }

    #[actix_rt::test]
    async fn test_schema_mismatch_is_a_miss() {
        let store = Arc::new(MemoryCacheStore::new());
        store
            .set("k", json!([{"title": "old format"}]), Duration::from_secs(60))
            .await;

        let cache = PlaceCache::new(store, Duration::from_secs(60));
        assert!(cache.get("k").await.is_none());
    }

    #[actix_rt::test]
    async fn test_coordinates_remember_hits_and_misses() {
        let cache = PlaceCache::new(Arc::new(MemoryCacheStore::new()), Duration::from_secs(60));
        let gyeongbokgung = Coordinates::new(37.5796, 126.977);

        assert_eq!(cache.get_coordinates("경복궁", "서울 종로구 사직로 161").await, None);

        cache
            .set_coordinates("경복궁", "서울 종로구 사직로 161", Some(gyeongbokgung))
            .await;
        cache.set_coordinates("없는곳", "서울 종로구", None).await;

        assert_eq!(
            cache.get_coordinates("경복궁", "서울 종로구 사직로 161").await,
            Some(Some(gyeongbokgung))
        );
        assert_eq!(cache.get_coordinates("없는곳", "서울 종로구").await, Some(None));
        assert_eq!(
            PlaceCache::coordinates_key("경복궁", "서울 종로구 사직로 161"),
            "coords:v1:경복궁:서울 종로구 사직로 161"
        );
    }
}
