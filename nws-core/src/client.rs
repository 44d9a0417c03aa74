//! HTTP client for api.weather.gov.
//!
//! [`NwsClient`] owns a preconfigured transport, a response cache, and
//! one thin method per upstream resource. Every method validates its
//! arguments, builds a deterministic path/parameter pair, dispatches
//! through [`NwsClient::get_json`], and returns the raw decoded document
//! unchanged; typed conversion lives in [`crate::model`] so raw and
//! typed callers share one cache.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::cache::ResponseCache;
use crate::config::ClientConfig;
use crate::error::NwsError;
use crate::model::{AlertsQuery, Coordinates, ZoneType};

/// Default page size for the products endpoint.
const DEFAULT_PRODUCT_LIMIT: u32 = 50;

/// Client for the NWS API.
///
/// The cache is owned by the instance: two clients never share entries,
/// and dropping the client drops its cache.
#[derive(Debug)]
pub struct NwsClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    cache_ttl_secs: i64,
    cache: ResponseCache,
}

impl NwsClient {
    /// Create a client from the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self, NwsError> {
        let mut headers = HeaderMap::new();

        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(|_| {
            NwsError::Validation(format!(
                "user agent {:?} is not a valid header value",
                config.user_agent
            ))
        })?;
        headers.insert(USER_AGENT, user_agent);
        headers.insert(ACCEPT, HeaderValue::from_static("application/geo+json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NwsError::Api {
                status: 0,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            cache_ttl_secs: config.cache_ttl_secs,
            cache: ResponseCache::new(),
        })
    }

    /// Fetch `path` with `params`, consulting the cache first.
    ///
    /// Exactly one GET goes out per cache miss, zero per hit. Responses
    /// classify as: 404 → `NotFound`, 429 → `RateLimited`, transport
    /// deadline → `Timeout`, any other non-2xx → `Api` with status and
    /// body, 2xx with an undecodable body → `Api` as well. Successful
    /// documents enter the cache with the configured TTL.
    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value, NwsError> {
        let key = cache_key(path, params);

        if let Some(cached) = self.cache.get(&key) {
            debug!(%path, "cache hit");
            return Ok(cached);
        }

        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%url, "requesting");

        let mut request = self.http.get(&url);
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(NwsError::NotFound(url));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(NwsError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NwsError::Api {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.classify_transport(e))?;

        let value: Value = serde_json::from_str(&body).map_err(|e| NwsError::Api {
            status: status.as_u16(),
            message: format!(
                "response body is not valid JSON: {e} ({})",
                truncate_body(&body)
            ),
        })?;

        self.cache.set(&key, value.clone(), self.cache_ttl_secs);

        Ok(value)
    }

    fn classify_transport(&self, err: reqwest::Error) -> NwsError {
        if err.is_timeout() {
            NwsError::Timeout(self.timeout_secs)
        } else {
            NwsError::Api {
                status: 0,
                message: format!("request failed: {err}"),
            }
        }
    }

    /// Metadata about a location, including its forecast grid.
    pub async fn get_points(&self, latitude: f64, longitude: f64) -> Result<Value, NwsError> {
        let point = Coordinates::new(latitude, longitude)?;
        let path = format!("points/{:.4},{:.4}", point.latitude, point.longitude);
        self.get_json(&path, &[]).await
    }

    /// Forecast for a location, resolved through its grid metadata.
    pub async fn get_forecast(&self, latitude: f64, longitude: f64) -> Result<Value, NwsError> {
        self.forecast_from_points(latitude, longitude, false).await
    }

    /// Hourly forecast for a location.
    pub async fn get_hourly_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Value, NwsError> {
        self.forecast_from_points(latitude, longitude, true).await
    }

    async fn forecast_from_points(
        &self,
        latitude: f64,
        longitude: f64,
        hourly: bool,
    ) -> Result<Value, NwsError> {
        // Point resolution failures propagate unchanged.
        let points = self.get_points(latitude, longitude).await?;

        let field = if hourly { "forecastHourly" } else { "forecast" };
        let forecast_url = points
            .pointer(&format!("/properties/{field}"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                NwsError::NotFound(format!("{field} URL missing from points response"))
            })?;

        // The points document carries absolute URLs; dispatch relative
        // to the configured base so the shared cache key stays stable.
        let path = forecast_url
            .strip_prefix(&self.base_url)
            .unwrap_or(forecast_url)
            .trim_start_matches('/')
            .to_string();

        self.get_json(&path, &[]).await
    }

    /// Forecast for a grid cell addressed directly by office and x/y.
    pub async fn get_grid_forecast(
        &self,
        office: &str,
        x: u32,
        y: u32,
        hourly: bool,
    ) -> Result<Value, NwsError> {
        let suffix = if hourly { "forecast/hourly" } else { "forecast" };
        let path = format!("gridpoints/{office}/{x},{y}/{suffix}");
        self.get_json(&path, &[]).await
    }

    /// Alerts matching `query`. `active=true` is sent unless the caller
    /// set `active` themselves; see [`AlertsQuery`].
    pub async fn get_alerts(&self, query: &AlertsQuery) -> Result<Value, NwsError> {
        let mut params: Vec<(&str, String)> = Vec::new();

        if let Some(area) = &query.area {
            params.push(("area", area.clone()));
        }
        if let Some(region) = &query.region {
            params.push(("region", region.clone()));
        }
        if let Some(zone) = &query.zone {
            params.push(("zone", zone.clone()));
        }
        if let Some(status) = &query.status {
            params.push(("status", status.clone()));
        }
        if let Some(message_type) = &query.message_type {
            params.push(("message_type", message_type.clone()));
        }
        if let Some(event) = &query.event {
            params.push(("event", event.clone()));
        }
        if query.active.unwrap_or(true) {
            params.push(("active", "true".to_string()));
        }

        self.get_json("alerts", &params).await
    }

    /// A single alert by its upstream identifier.
    pub async fn get_alert_by_id(&self, alert_id: &str) -> Result<Value, NwsError> {
        self.get_json(&format!("alerts/{alert_id}"), &[]).await
    }

    /// Observation stations, optionally filtered by state code.
    pub async fn get_stations(&self, state: Option<&str>) -> Result<Value, NwsError> {
        let mut params = Vec::new();
        if let Some(state) = state {
            params.push(("state", state.to_string()));
        }
        self.get_json("stations", &params).await
    }

    /// Observations from a station. `start`/`end` are assumed UTC and
    /// serialized with a literal `Z` suffix.
    pub async fn get_station_observations(
        &self,
        station_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Value, NwsError> {
        let mut params = Vec::new();
        if let Some(start) = start {
            params.push(("start", format_utc(start)));
        }
        if let Some(end) = end {
            params.push(("end", format_utc(end)));
        }
        self.get_json(&format!("stations/{station_id}/observations"), &params)
            .await
    }

    /// Most recent observation from a station.
    pub async fn get_latest_station_observation(
        &self,
        station_id: &str,
    ) -> Result<Value, NwsError> {
        self.get_json(&format!("stations/{station_id}/observations/latest"), &[])
            .await
    }

    /// A forecast office.
    pub async fn get_office(&self, office_id: &str) -> Result<Value, NwsError> {
        self.get_json(&format!("offices/{office_id}"), &[]).await
    }

    /// Headlines issued by a forecast office.
    pub async fn get_office_headlines(&self, office_id: &str) -> Result<Value, NwsError> {
        self.get_json(&format!("offices/{office_id}/headlines"), &[])
            .await
    }

    /// Zones of the given type, optionally filtered by area.
    pub async fn get_zones(
        &self,
        zone_type: ZoneType,
        area: Option<&str>,
    ) -> Result<Value, NwsError> {
        let mut params = Vec::new();
        if let Some(area) = area {
            params.push(("area", area.to_string()));
        }
        self.get_json(&format!("zones/{zone_type}"), &params).await
    }

    /// Forecast for a zone.
    pub async fn get_zone_forecast(&self, zone_id: &str) -> Result<Value, NwsError> {
        self.get_json(&format!("zones/forecast/{zone_id}/forecast"), &[])
            .await
    }

    /// Observations aggregated over a zone.
    pub async fn get_zone_observations(&self, zone_id: &str) -> Result<Value, NwsError> {
        self.get_json(&format!("zones/forecast/{zone_id}/observations"), &[])
            .await
    }

    /// Text products, newest first. `limit` defaults to 50.
    pub async fn get_products(
        &self,
        location: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Value, NwsError> {
        let mut params = vec![(
            "limit",
            limit.unwrap_or(DEFAULT_PRODUCT_LIMIT).to_string(),
        )];
        if let Some(location) = location {
            params.push(("location", location.to_string()));
        }
        if let Some(start) = start {
            params.push(("start", format_utc(start)));
        }
        if let Some(end) = end {
            params.push(("end", format_utc(end)));
        }
        self.get_json("products", &params).await
    }

    /// A single text product.
    pub async fn get_product(&self, product_id: &str) -> Result<Value, NwsError> {
        self.get_json(&format!("products/{product_id}"), &[]).await
    }

    /// The API glossary.
    pub async fn get_glossary(&self) -> Result<Value, NwsError> {
        self.get_json("glossary", &[]).await
    }

    /// An icon set; defaults to the "forecast" set.
    pub async fn get_icons(&self, set_name: Option<&str>) -> Result<Value, NwsError> {
        let set = set_name.unwrap_or("forecast");
        self.get_json(&format!("icons/{set}"), &[]).await
    }

    /// A single icon within a set.
    pub async fn get_icon(&self, set_name: &str, icon_name: &str) -> Result<Value, NwsError> {
        self.get_json(&format!("icons/{set_name}/{icon_name}"), &[])
            .await
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop only cached responses whose TTL has lapsed.
    pub fn clean_cache(&self) {
        self.cache.clean_expired();
    }

    /// Number of cached responses currently held.
    pub fn cache_entry_count(&self) -> usize {
        self.cache.entry_count()
    }
}

/// Deterministic cache key from path and name-sorted parameters.
fn cache_key(path: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort();

    let query: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{path}?{}", query.join("&"))
}

fn format_utc(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}
