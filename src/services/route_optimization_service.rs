//! Route Optimization Service
//!
//! Reorders the spots of one day so that consecutive stops inside a time band
//! are geographically close, avoiding back-and-forth routing.
//!
//! ## Rules
//! - Spots are split into morning (up to 12:00), afternoon (up to 17:00) and
//!   evening bands
//! - A band with more than two spots, all of them geocoded, is reordered with a
//!   greedy nearest-neighbor walk starting from its first spot
//! - A band with any spot lacking coordinates keeps its order
//! - The band's time slots stay where they were and are handed to the spots in
//!   their new order, so the day remains chronological
//!
//! Slots move but descriptions do not: a lunch spot reordered to the end of the
//! afternoon band is served at that band's last slot with its text unchanged.

use chrono::NaiveTime;
use log::debug;

use crate::models::course::{TravelDay, TravelSpot};
use crate::models::place::Coordinates;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1_rad = from.latitude.to_radians();
    let lat2_rad = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeBand {
    Morning,
    Afternoon,
    Evening,
}

impl TimeBand {
    pub fn of(time: NaiveTime) -> Self {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
        let five_pm = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);

        if time <= noon {
            TimeBand::Morning
        } else if time <= five_pm {
            TimeBand::Afternoon
        } else {
            TimeBand::Evening
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizationConfig {
    /// Bands with at most this many spots are left alone
    pub min_band_size: usize,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self { min_band_size: 3 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteOptimizer {
    config: OptimizationConfig,
}

impl RouteOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OptimizationConfig) -> Self {
        Self { config }
    }

    pub fn optimize(&self, mut day: TravelDay) -> TravelDay {
        day.spots.sort_by_key(|spot| spot.time);

        let mut optimized = Vec::with_capacity(day.spots.len());
        let mut band: Vec<TravelSpot> = Vec::new();
        let mut current_band = None;

        for spot in day.spots {
            let spot_band = TimeBand::of(spot.time);
            if current_band.is_some_and(|b| b != spot_band) {
                optimized.extend(self.optimize_band(std::mem::take(&mut band)));
            }
            current_band = Some(spot_band);
            band.push(spot);
        }
        optimized.extend(self.optimize_band(band));

        let stats = route_stats(&optimized);
        debug!(
            "Optimized {} spots on {} ({:.1} km, {} without coordinates)",
            stats.total_spots, day.date, stats.total_distance_km, stats.spots_without_coordinates
        );

        day.spots = optimized;
        day
    }

    fn optimize_band(&self, band: Vec<TravelSpot>) -> Vec<TravelSpot> {
        if band.len() < self.config.min_band_size {
            return band;
        }

        let Some(coordinates) = band
            .iter()
            .map(|spot| spot.coordinates)
            .collect::<Option<Vec<Coordinates>>>()
        else {
            return band;
        };

        let slots: Vec<NaiveTime> = band.iter().map(|spot| spot.time).collect();
        let order = nearest_neighbor_order(&coordinates);

        let mut spots: Vec<Option<TravelSpot>> = band.into_iter().map(Some).collect();
        order
            .into_iter()
            .zip(slots)
            .filter_map(|(idx, time)| {
                let mut spot = spots[idx].take()?;
                spot.time = time;
                Some(spot)
            })
            .collect()
    }
}

/// Greedy walk from the first point, always moving to the closest unvisited
/// one. Ties go to the earlier point.
fn nearest_neighbor_order(points: &[Coordinates]) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut unvisited: Vec<usize> = (1..points.len()).collect();
    let mut route = vec![0];
    let mut current = points[0];

    while !unvisited.is_empty() {
        let mut nearest_idx = 0;
        let mut nearest_distance = f64::INFINITY;

        for (idx, &candidate) in unvisited.iter().enumerate() {
            let distance = haversine_km(current, points[candidate]);
            if distance < nearest_distance {
                nearest_distance = distance;
                nearest_idx = idx;
            }
        }

        let next = unvisited.remove(nearest_idx);
        current = points[next];
        route.push(next);
    }

    route
}

#[derive(Debug, Default)]
pub struct RouteStats {
    pub total_spots: usize,
    pub spots_without_coordinates: usize,
    /// Sum of legs between consecutive geocoded spots
    pub total_distance_km: f64,
}

pub fn route_stats(spots: &[TravelSpot]) -> RouteStats {
    let geocoded: Vec<Coordinates> = spots.iter().filter_map(|s| s.coordinates).collect();

    RouteStats {
        total_spots: spots.len(),
        spots_without_coordinates: spots.len() - geocoded.len(),
        total_distance_km: geocoded
            .windows(2)
            .map(|leg| haversine_km(leg[0], leg[1]))
            .sum(),
    }
}
