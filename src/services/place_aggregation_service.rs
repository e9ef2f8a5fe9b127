//! Place Aggregation Service
//!
//! Collects candidate places for a region from every registered search
//! provider and caches the merged result.
//!
//! ## Flow per (region, category, areas)
//! 1. Serve from cache when a fresh entry exists
//! 2. Fan out one query per area and keyword phrasing to every provider
//! 3. Strip markup, prefer road addresses, drop duplicate names and anything
//!    whose address falls outside the region and requested areas
//! 4. Geocode places that still lack coordinates, reusing cached answers per
//!    (name, address) and calling the geocoder a few at a time
//! 5. Cache the list
//!
//! `search_all` gathers every category first and geocodes them in one pass, so
//! the group size caps geocoder concurrency for the whole request.
//!
//! A failing provider only loses its own contribution.

use futures::future::join_all;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, LazyLock};
use tokio::time::sleep;

use crate::config::AggregatorConfig;
use crate::db::place_cache::PlaceCache;
use crate::models::place::{Place, PlaceCategory};
use crate::services::place_search_service::{GeocodingProvider, PlaceHit, PlaceSearchProvider};

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup pattern"));

/// Candidates per category, each list in provider relevance order.
pub type CandidatePool = BTreeMap<PlaceCategory, Vec<Place>>;

pub fn pool_size(pool: &CandidatePool) -> usize {
    pool.values().map(Vec::len).sum()
}

/// One category's candidates before geocoding.
enum Lookup {
    Cached(Vec<Place>),
    Fetched {
        key: String,
        places: Vec<Place>,
        /// false when every query failed
        cacheable: bool,
    },
}

impl Lookup {
    fn fresh_places_mut(&mut self) -> &mut [Place] {
        match self {
            Lookup::Cached(_) => &mut [],
            Lookup::Fetched { places, .. } => places.as_mut_slice(),
        }
    }
}

pub struct PlaceAggregator {
    search_providers: Vec<Arc<dyn PlaceSearchProvider>>,
    geocoder: Option<Arc<dyn GeocodingProvider>>,
    cache: PlaceCache,
    config: AggregatorConfig,
}

impl PlaceAggregator {
    pub fn new(
        search_providers: Vec<Arc<dyn PlaceSearchProvider>>,
        geocoder: Option<Arc<dyn GeocodingProvider>>,
        cache: PlaceCache,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            search_providers,
            geocoder,
            cache,
            config,
        }
    }

    pub fn search_provider_names(&self) -> Vec<&'static str> {
        self.search_providers.iter().map(|p| p.name()).collect()
    }

    pub fn geocoder_name(&self) -> Option<&'static str> {
        self.geocoder.as_ref().map(|g| g.name())
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    /// Candidates for every category. Searches run concurrently, geocoding
    /// runs once over all categories.
    pub async fn search_all(&self, region: &str, areas: &[String]) -> CandidatePool {
        let lookups = PlaceCategory::ALL
            .iter()
            .map(move |&category| async move { (category, self.lookup(region, category, areas).await) });
        let mut lookups: Vec<(PlaceCategory, Lookup)> = join_all(lookups).await;

        let pending: Vec<&mut Place> = lookups
            .iter_mut()
            .flat_map(|(_, lookup)| lookup.fresh_places_mut().iter_mut())
            .collect();
        self.resolve_coordinates(pending).await;

        let finished = lookups
            .into_iter()
            .map(move |(category, lookup)| async move { (category, self.finish(region, category, areas, lookup).await) });
        join_all(finished).await.into_iter().collect()
    }

    pub async fn search(&self, region: &str, category: PlaceCategory, areas: &[String]) -> Vec<Place> {
        let mut lookup = self.lookup(region, category, areas).await;
        self.resolve_coordinates(lookup.fresh_places_mut().iter_mut().collect())
            .await;
        self.finish(region, category, areas, lookup).await
    }

    async fn lookup(&self, region: &str, category: PlaceCategory, areas: &[String]) -> Lookup {
        let key = PlaceCache::key(region, category, areas);
        if let Some(places) = self.cache.get(&key).await {
            info!("Using cached {} places for '{}'", places.len(), key);
            return Lookup::Cached(places);
        }

        let queries: Vec<String> = areas
            .iter()
            .flat_map(|area| {
                category
                    .search_keywords()
                    .iter()
                    .map(move |keyword| format!("{} {} {}", region, area.trim(), keyword))
            })
            .collect();

        let requests = queries.iter().flat_map(move |query| {
            self.search_providers.iter().map(move |provider| async move {
                let result = provider.search(query, self.config.search_display).await;
                (provider.name(), query, result)
            })
        });

        let mut hits: Vec<PlaceHit> = Vec::new();
        let mut succeeded = 0;
        for (provider, query, result) in join_all(requests).await {
            match result {
                Ok(found) => {
                    debug!("{} returned {} hits for '{}'", provider, found.len(), query);
                    succeeded += 1;
                    hits.extend(found);
                }
                Err(e) => warn!("{} search failed for '{}': {}", provider, query, e),
            }
        }

        Lookup::Fetched {
            key,
            places: merge_hits(hits, region, areas, category),
            cacheable: succeeded > 0,
        }
    }

    async fn finish(&self, region: &str, category: PlaceCategory, areas: &[String], lookup: Lookup) -> Vec<Place> {
        match lookup {
            Lookup::Cached(places) => places,
            Lookup::Fetched {
                key,
                places,
                cacheable,
            } => {
                info!(
                    "Aggregated {} {} places for {} {:?}",
                    places.len(),
                    category,
                    region,
                    areas
                );
                // A total outage must not be cached as "no places here".
                if cacheable {
                    self.cache.set(&key, &places).await;
                }
                places
            }
        }
    }

    /// Fill in coordinates for places lacking them. Cached answers are used
    /// first, the rest go to the geocoder `geocode_group_size` at a time with a
    /// pause between groups.
    async fn resolve_coordinates(&self, places: Vec<&mut Place>) {
        let Some(geocoder) = &self.geocoder else {
            return;
        };

        let pending: Vec<&mut Place> = places.into_iter().filter(|p| p.coordinates.is_none()).collect();
        if pending.is_empty() {
            return;
        }

        let known = join_all(
            pending
                .iter()
                .map(|place| self.cache.get_coordinates(&place.name, &place.address)),
        )
        .await;

        let mut uncached: Vec<&mut Place> = Vec::new();
        let mut from_cache = 0;
        for (place, cached) in pending.into_iter().zip(known) {
            match cached {
                Some(coordinates) => {
                    place.coordinates = coordinates;
                    from_cache += 1;
                }
                None => uncached.push(place),
            }
        }

        let mut resolved = 0;
        let total = uncached.len();
        for (group_index, group) in uncached.chunks_mut(self.config.geocode_group_size).enumerate() {
            if group_index > 0 && !self.config.geocode_delay.is_zero() {
                sleep(self.config.geocode_delay).await;
            }

            let results = join_all(
                group
                    .iter()
                    .map(|place| geocoder.geocode(&place.address, &place.name)),
            )
            .await;

            for (place, result) in group.iter_mut().zip(results) {
                match result {
                    Ok(coordinates) => {
                        if coordinates.is_some() {
                            resolved += 1;
                        } else {
                            debug!("No coordinates for '{}'", place.name);
                        }
                        self.cache
                            .set_coordinates(&place.name, &place.address, coordinates)
                            .await;
                        place.coordinates = coordinates;
                    }
                    Err(e) => warn!("Geocoding failed for '{}': {}", place.name, e),
                }
            }
        }

        debug!(
            "Geocoded {}/{} places, {} answered from cache",
            resolved, total, from_cache
        );
    }
}

/// Remove tags and the handful of entities search APIs put in titles.
pub fn strip_markup(text: &str) -> String {
    MARKUP
        .replace_all(text, "")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .trim()
        .to_string()
}

fn compact(text: &str) -> String {
    text.split_whitespace().collect()
}

/// Address must mention the region and at least one requested area,
/// ignoring whitespace differences.
pub fn matches_region(address: &str, region: &str, areas: &[String]) -> bool {
    let address = compact(address);
    address.contains(&compact(region)) && areas.iter().any(|area| address.contains(&compact(area)))
}

fn merge_hits(hits: Vec<PlaceHit>, region: &str, areas: &[String], category: PlaceCategory) -> Vec<Place> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut places = Vec::new();

    for hit in hits {
        let name = strip_markup(&hit.title);
        if name.is_empty() {
            continue;
        }

        let address = if hit.road_address.trim().is_empty() {
            hit.address.trim()
        } else {
            hit.road_address.trim()
        };

        if !matches_region(address, region, areas) {
            debug!("Dropping '{}' outside {} {:?}: {}", name, region, areas, address);
            continue;
        }

        if !seen.insert(name.clone()) {
            continue;
        }

        let mut place = Place::new(name, address, category);
        place.coordinates = hit.coordinates;
        places.push(place);
    }

    places
}
