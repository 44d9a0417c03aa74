//! Core client library for the National Weather Service API.
//!
//! This crate defines:
//! - An HTTP client with a time-bounded response cache ([`NwsClient`])
//! - A closed error taxonomy ([`NwsError`])
//! - Typed domain entities and the parsers producing them ([`model`])
//!
//! It is used by `nws-cli`, but can also be reused by other binaries or
//! services. Endpoint methods return raw JSON documents; run them
//! through [`model::parse_forecast`] and friends for typed access.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod model;

pub use cache::ResponseCache;
pub use client::NwsClient;
pub use config::ClientConfig;
pub use error::NwsError;
pub use model::{
    Alert, AlertsQuery, Coordinates, Forecast, ForecastPeriod, Observation, Precipitation,
    Temperature, TemperatureUnit, WeatherCondition, Wind, ZoneType, parse_alert, parse_alerts,
    parse_forecast, parse_observation,
};
