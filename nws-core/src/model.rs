//! Domain model and parsing layer.
//!
//! The dispatcher hands back raw `serde_json::Value` documents; the
//! `parse_*` functions here convert them into typed entities. Fields the
//! upstream schema allows to be absent or null become `None`, nothing is
//! silently defaulted, and a missing or malformed required field fails
//! the whole parse with a decode error.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::NwsError;

/// Validated geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Reject out-of-range values before anything touches the network.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, NwsError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(NwsError::Validation(
                "latitude must be between -90 and 90".into(),
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(NwsError::Validation(
                "longitude must be between -180 and 180".into(),
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Fahrenheit,
    Celsius,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "F",
            TemperatureUnit::Celsius => "C",
        }
    }

    /// Parse the unit spellings the API uses: bare letters in forecast
    /// periods ("F"), WMO codes in observations ("wmoUnit:degC").
    fn from_label(label: &str) -> Option<Self> {
        let tail = label.rsplit(':').next().unwrap_or(label);
        match tail {
            "F" | "f" | "degF" => Some(TemperatureUnit::Fahrenheit),
            "C" | "c" | "degC" => Some(TemperatureUnit::Celsius),
            _ => None,
        }
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A temperature tagged with the unit it was reported in.
///
/// Conversions are pure accessors; the stored value and unit never change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
    pub value: f64,
    pub unit: TemperatureUnit,
}

impl Temperature {
    pub fn new(value: f64, unit: TemperatureUnit) -> Self {
        Self { value, unit }
    }

    pub fn celsius(&self) -> f64 {
        match self.unit {
            TemperatureUnit::Celsius => self.value,
            TemperatureUnit::Fahrenheit => (self.value - 32.0) * 5.0 / 9.0,
        }
    }

    pub fn fahrenheit(&self) -> f64 {
        match self.unit {
            TemperatureUnit::Fahrenheit => self.value,
            TemperatureUnit::Celsius => self.value * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Wind speed and direction. Direction is always degrees (0-360);
/// compass strings from forecast periods are mapped during parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Wind {
    pub speed: f64,
    pub direction: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Precipitation {
    pub value: f64,
    pub kind: Option<String>,
    pub unit: String,
}

/// Human-facing condition summary, derived from periods and observations.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherCondition {
    pub description: String,
    pub icon: Option<String>,
}

/// One named time span within a forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPeriod {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub temperature: Temperature,
    pub wind: Wind,
    pub short_forecast: String,
    pub detailed_forecast: String,
    pub icon: Option<String>,
    pub precipitation_probability: Option<u8>,
}

impl ForecastPeriod {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition {
            description: self.short_forecast.clone(),
            icon: self.icon.clone(),
        }
    }
}

/// A forecast as an ordered sequence of periods.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub updated: DateTime<Utc>,
    pub periods: Vec<ForecastPeriod>,
}

impl Forecast {
    /// First period named "Today", if any. Recomputed on each call so it
    /// always reflects the current period list.
    pub fn today(&self) -> Option<&ForecastPeriod> {
        self.periods
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case("today"))
    }

    /// First period named "Tonight", if any.
    pub fn tonight(&self) -> Option<&ForecastPeriod> {
        self.periods
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case("tonight"))
    }
}

/// A single station observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub station: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<Temperature>,
    pub dewpoint: Option<Temperature>,
    pub wind: Option<Wind>,
    pub relative_humidity: Option<f64>,
    pub barometric_pressure: Option<f64>,
    pub visibility: Option<f64>,
    pub text_description: Option<String>,
    pub icon: Option<String>,
    pub precipitation_last_hour: Option<Precipitation>,
}

impl Observation {
    pub fn condition(&self) -> Option<WeatherCondition> {
        self.text_description.as_ref().map(|d| WeatherCondition {
            description: d.clone(),
            icon: self.icon.clone(),
        })
    }
}

/// An alert record as issued upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub id: String,
    pub event: String,
    pub headline: Option<String>,
    pub description: String,
    pub instruction: Option<String>,
    pub severity: String,
    pub certainty: String,
    pub urgency: String,
    pub sent: DateTime<Utc>,
    pub effective: DateTime<Utc>,
    pub onset: Option<DateTime<Utc>>,
    pub expires: DateTime<Utc>,
    pub ends: Option<DateTime<Utc>>,
    pub status: String,
    pub message_type: String,
    pub category: String,
    pub response: String,
    pub affected_zones: Vec<String>,
    pub affected_counties: Vec<String>,
}

/// Zone categories the API recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneType {
    Forecast,
    County,
    Fire,
}

impl ZoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Forecast => "forecast",
            ZoneType::County => "county",
            ZoneType::Fire => "fire",
        }
    }

    pub const fn all() -> &'static [ZoneType] {
        &[ZoneType::Forecast, ZoneType::County, ZoneType::Fire]
    }
}

impl std::fmt::Display for ZoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ZoneType {
    type Error = NwsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "forecast" => Ok(ZoneType::Forecast),
            "county" => Ok(ZoneType::County),
            "fire" => Ok(ZoneType::Fire),
            _ => Err(NwsError::Validation(format!(
                "unknown zone type '{value}'; expected one of: forecast, county, fire"
            ))),
        }
    }
}

/// Filters for the alerts endpoint.
///
/// `active` is injected as `true` when left unset; a caller-supplied
/// value wins, and `Some(false)` omits the parameter entirely.
#[derive(Debug, Clone, Default)]
pub struct AlertsQuery {
    pub area: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub status: Option<String>,
    pub message_type: Option<String>,
    pub event: Option<String>,
    pub active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Raw document shapes, as served by the API.

#[derive(Debug, Deserialize)]
struct ForecastDocument {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    updated: String,
    #[serde(default)]
    periods: Vec<RawPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPeriod {
    name: String,
    start_time: String,
    end_time: String,
    temperature: f64,
    temperature_unit: String,
    wind_speed: String,
    wind_direction: String,
    short_forecast: String,
    detailed_forecast: String,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    probability_of_precipitation: Option<RawQuantity>,
}

/// The `{value, unitCode}` quantity shape observations use throughout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuantity {
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    unit_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObservationDocument {
    properties: ObservationProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObservationProperties {
    station: String,
    timestamp: String,
    #[serde(default)]
    temperature: Option<RawQuantity>,
    #[serde(default)]
    dewpoint: Option<RawQuantity>,
    #[serde(default)]
    wind_speed: Option<RawQuantity>,
    #[serde(default)]
    wind_direction: Option<RawQuantity>,
    #[serde(default)]
    relative_humidity: Option<RawQuantity>,
    #[serde(default)]
    barometric_pressure: Option<RawQuantity>,
    #[serde(default)]
    visibility: Option<RawQuantity>,
    #[serde(default)]
    text_description: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    precipitation_last_hour: Option<RawQuantity>,
}

#[derive(Debug, Deserialize)]
struct AlertDocument {
    properties: AlertProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertProperties {
    id: String,
    event: String,
    #[serde(default)]
    headline: Option<String>,
    description: String,
    #[serde(default)]
    instruction: Option<String>,
    severity: String,
    certainty: String,
    urgency: String,
    sent: String,
    effective: String,
    #[serde(default)]
    onset: Option<String>,
    expires: String,
    #[serde(default)]
    ends: Option<String>,
    status: String,
    message_type: String,
    category: String,
    response: String,
    #[serde(default)]
    affected_zones: Vec<String>,
    #[serde(default)]
    geocode: Option<RawGeocode>,
}

#[derive(Debug, Deserialize)]
struct RawGeocode {
    #[serde(rename = "SAME", default)]
    same: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AlertCollection {
    #[serde(default)]
    features: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Parsing.

/// Parse a forecast document (regular or hourly) into a [`Forecast`].
pub fn parse_forecast(doc: &Value) -> Result<Forecast, NwsError> {
    let doc: ForecastDocument = decode("forecast", doc)?;

    let updated = parse_timestamp("updated", &doc.properties.updated)?;

    let mut periods = Vec::with_capacity(doc.properties.periods.len());
    for raw in &doc.properties.periods {
        periods.push(convert_period(raw)?);
    }

    Ok(Forecast { updated, periods })
}

fn convert_period(raw: &RawPeriod) -> Result<ForecastPeriod, NwsError> {
    let unit = TemperatureUnit::from_label(&raw.temperature_unit).ok_or_else(|| {
        NwsError::decode(format!(
            "unknown temperature unit {:?} in period {:?}",
            raw.temperature_unit, raw.name
        ))
    })?;

    let precipitation_probability = match &raw.probability_of_precipitation {
        Some(q) => match q.value {
            Some(v) => Some(u8::try_from(v.round() as i64).map_err(|_| {
                NwsError::decode(format!("precipitation probability {v} out of range"))
            })?),
            None => None,
        },
        None => None,
    };

    Ok(ForecastPeriod {
        name: raw.name.clone(),
        start_time: parse_timestamp("startTime", &raw.start_time)?,
        end_time: parse_timestamp("endTime", &raw.end_time)?,
        temperature: Temperature::new(raw.temperature, unit),
        wind: Wind {
            speed: parse_wind_speed(&raw.wind_speed)?,
            direction: parse_wind_direction(&raw.wind_direction)?,
            unit: wind_speed_unit(&raw.wind_speed),
        },
        short_forecast: raw.short_forecast.clone(),
        detailed_forecast: raw.detailed_forecast.clone(),
        icon: raw.icon.clone(),
        precipitation_probability,
    })
}

/// Parse a station observation document into an [`Observation`].
pub fn parse_observation(doc: &Value) -> Result<Observation, NwsError> {
    let doc: ObservationDocument = decode("observation", doc)?;
    let props = doc.properties;

    let wind = match (&props.wind_speed, &props.wind_direction) {
        (Some(speed_q), Some(dir_q)) => match (speed_q.value, dir_q.value) {
            // Calm wind reports a null direction; no direction, no Wind.
            (Some(speed), Some(direction)) => Some(Wind {
                speed,
                direction,
                unit: unit_label("windSpeed", speed_q)?,
            }),
            _ => None,
        },
        _ => None,
    };

    Ok(Observation {
        station: props.station,
        timestamp: parse_timestamp("timestamp", &props.timestamp)?,
        temperature: quantity_temperature("temperature", props.temperature.as_ref())?,
        dewpoint: quantity_temperature("dewpoint", props.dewpoint.as_ref())?,
        wind,
        relative_humidity: props.relative_humidity.as_ref().and_then(|q| q.value),
        barometric_pressure: props.barometric_pressure.as_ref().and_then(|q| q.value),
        visibility: props.visibility.as_ref().and_then(|q| q.value),
        text_description: props.text_description,
        icon: props.icon,
        precipitation_last_hour: match props.precipitation_last_hour.as_ref() {
            Some(q) => match q.value {
                Some(value) => Some(Precipitation {
                    value,
                    kind: None,
                    unit: unit_label("precipitationLastHour", q)?,
                }),
                None => None,
            },
            None => None,
        },
    })
}

/// Parse a single alert feature into an [`Alert`].
pub fn parse_alert(doc: &Value) -> Result<Alert, NwsError> {
    let doc: AlertDocument = decode("alert", doc)?;
    let props = doc.properties;

    let affected_zones = props
        .affected_zones
        .iter()
        .map(|url| url.rsplit('/').next().unwrap_or(url).to_string())
        .collect();

    Ok(Alert {
        sent: parse_timestamp("sent", &props.sent)?,
        effective: parse_timestamp("effective", &props.effective)?,
        onset: props
            .onset
            .as_deref()
            .map(|s| parse_timestamp("onset", s))
            .transpose()?,
        expires: parse_timestamp("expires", &props.expires)?,
        ends: props
            .ends
            .as_deref()
            .map(|s| parse_timestamp("ends", s))
            .transpose()?,
        id: props.id,
        event: props.event,
        headline: props.headline,
        description: props.description,
        instruction: props.instruction,
        severity: props.severity,
        certainty: props.certainty,
        urgency: props.urgency,
        status: props.status,
        message_type: props.message_type,
        category: props.category,
        response: props.response,
        affected_zones,
        affected_counties: props.geocode.map(|g| g.same).unwrap_or_default(),
    })
}

/// Parse an alert feature collection, preserving document order.
pub fn parse_alerts(doc: &Value) -> Result<Vec<Alert>, NwsError> {
    let collection: AlertCollection = decode("alert collection", doc)?;
    collection.features.iter().map(parse_alert).collect()
}

fn decode<T: serde::de::DeserializeOwned>(what: &str, doc: &Value) -> Result<T, NwsError> {
    serde_json::from_value(doc.clone())
        .map_err(|e| NwsError::decode(format!("failed to decode {what} document: {e}")))
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, NwsError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NwsError::decode(format!("malformed {field} timestamp {raw:?}: {e}")))
}

/// Forecast wind speeds are prose ("10 mph", "10 to 15 mph"); the first
/// number is the reported speed.
fn parse_wind_speed(raw: &str) -> Result<f64, NwsError> {
    raw.split_whitespace()
        .find_map(|token| token.parse::<f64>().ok())
        .ok_or_else(|| NwsError::decode(format!("unparseable wind speed {raw:?}")))
}

fn wind_speed_unit(raw: &str) -> String {
    raw.split_whitespace()
        .rev()
        .find(|token| token.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or("mph")
        .to_string()
}

/// Forecast wind directions are 16-point compass strings; observations
/// report numeric degrees. Accept either.
fn parse_wind_direction(raw: &str) -> Result<f64, NwsError> {
    if let Ok(degrees) = raw.trim().parse::<f64>() {
        return Ok(degrees);
    }
    compass_to_degrees(raw)
        .ok_or_else(|| NwsError::decode(format!("unparseable wind direction {raw:?}")))
}

fn compass_to_degrees(direction: &str) -> Option<f64> {
    const ROSE: [(&str, f64); 16] = [
        ("N", 0.0),
        ("NNE", 22.5),
        ("NE", 45.0),
        ("ENE", 67.5),
        ("E", 90.0),
        ("ESE", 112.5),
        ("SE", 135.0),
        ("SSE", 157.5),
        ("S", 180.0),
        ("SSW", 202.5),
        ("SW", 225.0),
        ("WSW", 247.5),
        ("W", 270.0),
        ("WNW", 292.5),
        ("NW", 315.0),
        ("NNW", 337.5),
    ];

    let needle = direction.trim().to_ascii_uppercase();
    ROSE.iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, degrees)| *degrees)
}

fn quantity_temperature(
    field: &str,
    quantity: Option<&RawQuantity>,
) -> Result<Option<Temperature>, NwsError> {
    let Some(q) = quantity else { return Ok(None) };
    let Some(value) = q.value else { return Ok(None) };

    let label = q
        .unit_code
        .as_deref()
        .ok_or_else(|| NwsError::decode(format!("{field} quantity is missing its unitCode")))?;
    let unit = TemperatureUnit::from_label(label)
        .ok_or_else(|| NwsError::decode(format!("unknown {field} unit {label:?}")))?;

    Ok(Some(Temperature::new(value, unit)))
}

fn unit_label(field: &str, quantity: &RawQuantity) -> Result<String, NwsError> {
    quantity
        .unit_code
        .as_deref()
        .map(|code| code.rsplit(':').next().unwrap_or(code).to_string())
        .ok_or_else(|| NwsError::decode(format!("{field} quantity is missing its unitCode")))
}
