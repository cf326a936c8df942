//! Address resolution against the Nominatim geocoder.
//!
//! Listing create/update hands a free-text location string to
//! [`GeocodingService::resolve`] and always gets a usable [`GeoPoint`] back:
//! the full sanitized address is tried first, then the last comma-separated
//! component as a city-only fallback, and finally a fixed default point.
//! Geocoding problems are logged, never surfaced to the caller, so saving a
//! listing is never blocked on the geocoder.

use std::{env, time::Duration};

use serde::Deserialize;

use crate::models::geo::GeoPoint;

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_USER_AGENT: &str = "Wanderlust_Travel_App";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Remote geocoder settings, injected rather than read from globals so tests
/// and deployments can substitute their own.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl GeocoderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let timeout_secs = env::var("GEOCODER_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url: env::var("NOMINATIM_BASE_URL").unwrap_or(defaults.base_url),
            user_agent: env::var("GEOCODER_USER_AGENT").unwrap_or(defaults.user_agent),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// One match from the geocoder. Nominatim sends coordinates as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeHit {
    pub lat: String,
    pub lon: String,
}

#[derive(Debug)]
pub enum GeocodeError {
    Transport(String),
    UnexpectedStatus(u16),
}

pub trait GeocodeTransport {
    /// Runs one search query, at most one match requested.
    /// `address_details` mirrors Nominatim's `addressdetails` flag.
    async fn search(
        &self,
        query: &str,
        address_details: bool,
    ) -> Result<Vec<GeocodeHit>, GeocodeError>;
}

/// Production transport over the public Nominatim HTTP API. The service
/// rejects anonymous clients, so every request carries a User-Agent.
pub struct NominatimTransport {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimTransport {
    pub fn new(config: &GeocoderConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        })
    }
}

impl GeocodeTransport for NominatimTransport {
    async fn search(
        &self,
        query: &str,
        address_details: bool,
    ) -> Result<Vec<GeocodeHit>, GeocodeError> {
        let mut params = vec![("q", query), ("format", "json"), ("limit", "1")];
        if address_details {
            params.push(("addressdetails", "1"));
        }

        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&params)
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .send()
            .await
            .map_err(|err| GeocodeError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::UnexpectedStatus(status.as_u16()));
        }

        response
            .json::<Vec<GeocodeHit>>()
            .await
            .map_err(|err| GeocodeError::Transport(err.to_string()))
    }
}

/// Which attempt produced the stored coordinate. Logged for data-quality
/// monitoring since callers never see resolution failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    Primary,
    Fallback,
    Default,
}

impl ResolutionTier {
    fn as_str(&self) -> &str {
        match self {
            ResolutionTier::Primary => "primary",
            ResolutionTier::Fallback => "fallback",
            ResolutionTier::Default => "default",
        }
    }
}

pub struct GeocodingService<T> {
    transport: T,
    default_point: GeoPoint,
}

impl<T: GeocodeTransport> GeocodingService<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            default_point: GeoPoint::default(),
        }
    }

    /// Resolves a free-text location to a coordinate. Never fails: transport
    /// errors, empty result sets, and malformed payloads all degrade to the
    /// fallback tier and finally to the default point.
    pub async fn resolve(&self, location: &str) -> GeoPoint {
        self.resolve_with_tier(location).await.0
    }

    pub async fn resolve_with_tier(&self, location: &str) -> (GeoPoint, ResolutionTier) {
        let sanitized = sanitize_location(location);
        if sanitized.is_empty() {
            log::warn!("geocoding skipped for blank location, using default point");
            return (self.default_point, ResolutionTier::Default);
        }

        if let Some(point) = self.query_tier(&sanitized, true).await {
            log::info!(
                "geocoded {:?} via {} tier -> [{}, {}]",
                sanitized,
                ResolutionTier::Primary.as_str(),
                point.longitude(),
                point.latitude()
            );
            return (point, ResolutionTier::Primary);
        }

        // City-only retry: the last comma-separated component is the least
        // specific part of a "street, city, country" style address.
        let city_only = sanitized
            .rsplit(',')
            .next()
            .unwrap_or(&sanitized)
            .trim()
            .to_string();
        log::warn!(
            "geocoding miss for {:?}, retrying with city fallback {:?}",
            sanitized,
            city_only
        );

        if let Some(point) = self.query_tier(&city_only, false).await {
            log::info!(
                "geocoded {:?} via {} tier -> [{}, {}]",
                city_only,
                ResolutionTier::Fallback.as_str(),
                point.longitude(),
                point.latitude()
            );
            return (point, ResolutionTier::Fallback);
        }

        log::warn!(
            "geocoding failed for {:?}, using {} point [{}, {}]",
            sanitized,
            ResolutionTier::Default.as_str(),
            self.default_point.longitude(),
            self.default_point.latitude()
        );
        (self.default_point, ResolutionTier::Default)
    }

    /// One query attempt. Any failure mode is a miss: transport errors,
    /// empty result sets, unparseable or out-of-range coordinates.
    async fn query_tier(&self, query: &str, address_details: bool) -> Option<GeoPoint> {
        let hits = match self.transport.search(query, address_details).await {
            Ok(hits) => hits,
            Err(err) => {
                log::warn!("geocoder request failed for {:?}: {:?}", query, err);
                return None;
            }
        };

        let hit = hits.first()?;
        let latitude: f64 = match hit.lat.parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("geocoder returned malformed latitude {:?}", hit.lat);
                return None;
            }
        };
        let longitude: f64 = match hit.lon.parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("geocoder returned malformed longitude {:?}", hit.lon);
                return None;
            }
        };

        GeoPoint::new(longitude, latitude)
    }
}

/// Strips parenthesis/bracket annotation noise like "(near airport)" that
/// confuses the geocoder, plus surrounding whitespace.
fn sanitize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Canned transport: maps exact query strings to responses and records
    /// every outbound query.
    struct StubTransport {
        responses: Vec<(String, Result<Vec<GeocodeHit>, ()>)>,
        queries: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn new(responses: Vec<(&str, Result<Vec<GeocodeHit>, ()>)>) -> Self {
            Self {
                responses: responses
                    .into_iter()
                    .map(|(query, result)| (query.to_string(), result))
                    .collect(),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn recorded_queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl GeocodeTransport for StubTransport {
        async fn search(
            &self,
            query: &str,
            _address_details: bool,
        ) -> Result<Vec<GeocodeHit>, GeocodeError> {
            self.queries.lock().unwrap().push(query.to_string());
            match self.responses.iter().find(|(q, _)| q == query) {
                Some((_, Ok(hits))) => Ok(hits.clone()),
                Some((_, Err(()))) => Err(GeocodeError::Transport("connection refused".to_string())),
                None => Ok(Vec::new()),
            }
        }
    }

    fn hit(lat: &str, lon: &str) -> Vec<GeocodeHit> {
        vec![GeocodeHit {
            lat: lat.to_string(),
            lon: lon.to_string(),
        }]
    }

    #[actix_web::test]
    async fn test_primary_hit_parses_string_coordinates() {
        let service = GeocodingService::new(StubTransport::new(vec![(
            "Connaught Place, New Delhi",
            Ok(hit("28.6139", "77.2090")),
        )]));

        let (point, tier) = service.resolve_with_tier("Connaught Place, New Delhi").await;
        assert_eq!(tier, ResolutionTier::Primary);
        assert_eq!(point.latitude(), 28.6139);
        assert_eq!(point.longitude(), 77.2090);
    }

    #[actix_web::test]
    async fn test_sanitizes_parens_and_brackets_before_querying() {
        let service = GeocodingService::new(StubTransport::new(vec![(
            "Some Place, City",
            Ok(hit("10.0", "20.0")),
        )]));

        service.resolve("(Some Place), [City]").await;
        assert_eq!(
            service.transport.recorded_queries(),
            vec!["Some Place, City"]
        );
    }

    #[actix_web::test]
    async fn test_falls_back_to_last_comma_component() {
        let service = GeocodingService::new(StubTransport::new(vec![
            ("123 Nowhere Rd, City", Ok(Vec::new())),
            ("City", Ok(hit("48.8566", "2.3522"))),
        ]));

        let (point, tier) = service.resolve_with_tier("123 Nowhere Rd, City").await;
        assert_eq!(tier, ResolutionTier::Fallback);
        assert_eq!(point.longitude(), 2.3522);
        assert_eq!(point.latitude(), 48.8566);
        assert_eq!(
            service.transport.recorded_queries(),
            vec!["123 Nowhere Rd, City", "City"]
        );
    }

    #[actix_web::test]
    async fn test_two_misses_yield_default_point() {
        let service = GeocodingService::new(StubTransport::new(Vec::new()));

        let (point, tier) = service.resolve_with_tier("Nonexistent Place").await;
        assert_eq!(tier, ResolutionTier::Default);
        assert_eq!(point.longitude(), 77.2090);
        assert_eq!(point.latitude(), 28.6139);
        assert_eq!(service.transport.recorded_queries().len(), 2);
    }

    #[actix_web::test]
    async fn test_transport_error_on_primary_still_reaches_fallback() {
        let service = GeocodingService::new(StubTransport::new(vec![
            ("Broken Pier, Mumbai", Err(())),
            ("Mumbai", Ok(hit("19.0760", "72.8777"))),
        ]));

        let (point, tier) = service.resolve_with_tier("Broken Pier, Mumbai").await;
        assert_eq!(tier, ResolutionTier::Fallback);
        assert_eq!(point.longitude(), 72.8777);
    }

    #[actix_web::test]
    async fn test_transport_error_on_both_tiers_yields_default() {
        let service = GeocodingService::new(StubTransport::new(vec![
            ("Broken, Pier", Err(())),
            ("Pier", Err(())),
        ]));

        let point = service.resolve("Broken, Pier").await;
        assert_eq!(point.longitude(), 77.2090);
        assert_eq!(point.latitude(), 28.6139);
    }

    #[actix_web::test]
    async fn test_malformed_coordinates_are_a_miss() {
        let service = GeocodingService::new(StubTransport::new(vec![(
            "Garbled Town",
            Ok(hit("not-a-number", "77.0")),
        )]));

        let (point, tier) = service.resolve_with_tier("Garbled Town").await;
        assert_eq!(tier, ResolutionTier::Default);
        assert_eq!(point.longitude(), 77.2090);
    }

    #[actix_web::test]
    async fn test_out_of_range_coordinates_are_a_miss() {
        let service = GeocodingService::new(StubTransport::new(vec![(
            "Edge Of The World",
            Ok(hit("91.0", "200.0")),
        )]));

        let (_, tier) = service.resolve_with_tier("Edge Of The World").await;
        assert_eq!(tier, ResolutionTier::Default);
    }

    #[actix_web::test]
    async fn test_blank_input_short_circuits_to_default() {
        let service = GeocodingService::new(StubTransport::new(Vec::new()));

        let (point, tier) = service.resolve_with_tier("()[] ").await;
        assert_eq!(tier, ResolutionTier::Default);
        assert_eq!(point.longitude(), 77.2090);
        assert!(service.transport.recorded_queries().is_empty());
    }

    #[test]
    fn test_sanitize_strips_annotation_noise() {
        assert_eq!(
            sanitize_location(" (near airport) Indira Colony, Delhi "),
            "near airport Indira Colony, Delhi"
        );
        assert_eq!(sanitize_location("[Old Town], Prague"), "Old Town, Prague");
    }
}
