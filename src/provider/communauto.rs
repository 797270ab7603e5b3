//! Communauto availability provider
//!
//! Polls the Reservauto front-office API until at least one vehicle matches
//! the request, then reports how many did.

use super::SearchError;
use crate::runtime::{SearchOutcome, SearchProvider};
use crate::state_machine::{Location, SearchMode, SearchRequest, SearchWindow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const EARTH_RADIUS_KM: f64 = 6371.0;
const KM_PER_DEGREE_LATITUDE: f64 = 111.32;
/// Consecutive transient failures tolerated before giving up
const MAX_CONSECUTIVE_FAILURES: u32 = 5;
const API_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
struct ApiLocation {
    latitude: f64,
    longitude: f64,
}

impl From<ApiLocation> for Location {
    fn from(loc: ApiLocation) -> Self {
        Location::new(loc.latitude, loc.longitude)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlexVehicle {
    vehicle_location: ApiLocation,
}

#[derive(Debug, Deserialize)]
struct FlexAvailability {
    #[serde(default)]
    vehicles: Vec<FlexVehicle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Station {
    station_location: ApiLocation,
    #[serde(default)]
    satisfies_filters: bool,
}

#[derive(Debug, Deserialize)]
struct StationAvailability {
    #[serde(default)]
    stations: Vec<Station>,
}

// ============================================================================
// Geometry
// ============================================================================

/// Great-circle distance between two positions
fn distance_km(a: Location, b: Location) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Latitude/longitude box enclosing the search circle
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundingBox {
    min_latitude: f64,
    max_latitude: f64,
    min_longitude: f64,
    max_longitude: f64,
}

impl BoundingBox {
    fn around(center: Location, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE_LATITUDE;
        let lon_delta =
            radius_km / (KM_PER_DEGREE_LATITUDE * center.latitude.to_radians().cos().max(0.01));
        Self {
            min_latitude: (center.latitude - lat_delta).max(-90.0),
            max_latitude: (center.latitude + lat_delta).min(90.0),
            min_longitude: (center.longitude - lon_delta).max(-180.0),
            max_longitude: (center.longitude + lon_delta).min(180.0),
        }
    }

    fn query(&self) -> [(&'static str, String); 4] {
        [
            ("MaxLatitude", self.max_latitude.to_string()),
            ("MinLatitude", self.min_latitude.to_string()),
            ("MaxLongitude", self.max_longitude.to_string()),
            ("MinLongitude", self.min_longitude.to_string()),
        ]
    }
}

fn to_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn count_flex(availability: &FlexAvailability, center: Location, radius_km: f64) -> u32 {
    to_count(
        availability
            .vehicles
            .iter()
            .filter(|v| distance_km(center, v.vehicle_location.into()) <= radius_km)
            .count(),
    )
}

fn count_stations(availability: &StationAvailability, center: Location, radius_km: f64) -> u32 {
    to_count(
        availability
            .stations
            .iter()
            .filter(|s| s.satisfies_filters)
            .filter(|s| distance_km(center, s.station_location.into()) <= radius_km)
            .count(),
    )
}

// ============================================================================
// Provider
// ============================================================================

/// Searches Communauto availability for one city
pub struct CommunautoFinder {
    client: Client,
    base_url: String,
    city_id: u32,
    poll_interval: Duration,
}

impl CommunautoFinder {
    pub fn new(base_url: &str, city_id: u32, poll_interval: Duration) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            city_id,
            poll_interval,
        })
    }

    /// One availability query; how many vehicles currently match
    async fn count_once(&self, request: &SearchRequest) -> Result<u32, SearchError> {
        let bbox = BoundingBox::around(request.location, request.radius_km);
        let mut query = vec![("CityId", self.city_id.to_string())];
        query.extend(bbox.query());

        match (request.mode, &request.window) {
            (SearchMode::ByFlexZone, _) => {
                let availability: FlexAvailability = self
                    .get("/api/v2/Vehicle/FreeFloatingAvailability", &query)
                    .await?;
                Ok(count_flex(&availability, request.location, request.radius_km))
            }
            (SearchMode::ByStation, Some(window)) => {
                query.extend(window_query(window));
                let availability: StationAvailability =
                    self.get("/api/v2/StationAvailability", &query).await?;
                Ok(count_stations(&availability, request.location, request.radius_km))
            }
            (SearchMode::ByStation, None) => Err(SearchError::invalid_criteria(
                "station search without rental window",
            )),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SearchError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::server_error(format!("availability API returned {status}")));
        }
        if !status.is_success() {
            return Err(SearchError::invalid_criteria(format!(
                "availability API returned {status}"
            )));
        }

        Ok(response.json().await?)
    }
}

fn window_query(window: &SearchWindow) -> [(&'static str, String); 2] {
    [
        ("StartDate", window.start().format(API_DATE_FORMAT).to_string()),
        ("EndDate", window.end().format(API_DATE_FORMAT).to_string()),
    ]
}

#[async_trait]
impl SearchProvider for CommunautoFinder {
    async fn search(&self, request: &SearchRequest, cancel: CancellationToken) -> SearchOutcome {
        let mut failures = 0;

        loop {
            let attempt = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SearchError::cancelled()),
                attempt = self.count_once(request) => attempt,
            };

            match attempt {
                Ok(count) if count > 0 => return Ok(count),
                Ok(_) => {
                    failures = 0;
                    tracing::debug!(mode = request.mode.label(), "No vehicle available yet");
                }
                Err(e) if e.kind.is_retryable() && failures < MAX_CONSECUTIVE_FAILURES => {
                    failures += 1;
                    tracing::warn!(error = %e, failures, "Availability query failed, will retry");
                }
                Err(e) => return Err(e),
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SearchError::cancelled()),
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
