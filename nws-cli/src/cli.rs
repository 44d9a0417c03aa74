use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use nws_core::{
    AlertsQuery, ClientConfig, NwsClient, parse_alerts, parse_forecast, parse_observation,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nws", version, about = "National Weather Service CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the contact string sent as the User-Agent header.
    Configure,

    /// Show the forecast for a coordinate pair.
    Forecast {
        latitude: f64,
        longitude: f64,

        /// Hour-by-hour periods instead of day/night ones.
        #[arg(long)]
        hourly: bool,
    },

    /// Show the latest observation from a station.
    Observation {
        /// Station identifier, e.g. "KBOS".
        station: String,
    },

    /// List recent observations from a station.
    Observations {
        /// Station identifier, e.g. "KBOS".
        station: String,

        /// UTC start time, RFC 3339 (e.g. 2025-03-01T00:00:00Z).
        #[arg(long)]
        start: Option<String>,

        /// UTC end time, RFC 3339.
        #[arg(long)]
        end: Option<String>,
    },

    /// List active alerts.
    Alerts {
        /// State/territory or marine area code, e.g. "KS".
        #[arg(long)]
        area: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Forecast {
                latitude,
                longitude,
                hourly,
            } => show_forecast(latitude, longitude, hourly).await,
            Command::Observation { station } => show_latest_observation(&station).await,
            Command::Observations {
                station,
                start,
                end,
            } => show_observations(&station, start, end).await,
            Command::Alerts { area } => show_alerts(area).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = ClientConfig::load()?;

    let contact = inquire::Text::new("Contact string for the User-Agent header:")
        .with_help_message("api.weather.gov asks for an app name and contact, e.g. my-app/1.0 (me@example.com)")
        .with_default(&config.user_agent)
        .prompt()
        .context("Failed to read contact string")?;

    config.user_agent = contact;
    config.save()?;

    println!(
        "Saved configuration to {}",
        ClientConfig::config_file_path()?.display()
    );
    Ok(())
}

fn client() -> anyhow::Result<NwsClient> {
    let config = ClientConfig::load()?;
    NwsClient::new(config).context("Failed to build NWS client")
}

async fn show_forecast(latitude: f64, longitude: f64, hourly: bool) -> anyhow::Result<()> {
    let client = client()?;
    let raw = if hourly {
        client.get_hourly_forecast(latitude, longitude).await?
    } else {
        client.get_forecast(latitude, longitude).await?
    };
    let forecast = parse_forecast(&raw)?;

    println!(
        "Forecast updated {}",
        forecast.updated.format("%Y-%m-%d %H:%M UTC")
    );

    if let Some(today) = forecast.today() {
        println!("Today: {}", today.detailed_forecast);
    }
    if let Some(tonight) = forecast.tonight() {
        println!("Tonight: {}", tonight.detailed_forecast);
    }

    println!();
    for period in &forecast.periods {
        let precip = period
            .precipitation_probability
            .map(|p| format!(" ({p}% precip)"))
            .unwrap_or_default();
        println!(
            "{:<16} {:>5.1} deg{}  {}{precip}",
            period.name,
            period.temperature.value,
            period.temperature.unit,
            period.short_forecast,
        );
    }

    Ok(())
}

async fn show_latest_observation(station: &str) -> anyhow::Result<()> {
    let client = client()?;
    let raw = client.get_latest_station_observation(station).await?;
    let obs = parse_observation(&raw)?;

    println!(
        "Observation from {station} at {}",
        obs.timestamp.format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(condition) = obs.condition() {
        println!("Conditions: {}", condition.description);
    }
    if let Some(temperature) = obs.temperature {
        println!(
            "Temperature: {:.1} degC / {:.1} degF",
            temperature.celsius(),
            temperature.fahrenheit()
        );
    }
    if let Some(wind) = &obs.wind {
        println!("Wind: {:.1} {} from {:.0} degrees", wind.speed, wind.unit, wind.direction);
    }
    if let Some(humidity) = obs.relative_humidity {
        println!("Humidity: {humidity:.0}%");
    }

    Ok(())
}

async fn show_observations(
    station: &str,
    start: Option<String>,
    end: Option<String>,
) -> anyhow::Result<()> {
    let start = parse_time_arg("--start", start)?;
    let end = parse_time_arg("--end", end)?;

    let client = client()?;
    let raw = client.get_station_observations(station, start, end).await?;

    let features = raw
        .get("features")
        .and_then(|f| f.as_array())
        .cloned()
        .unwrap_or_default();

    if features.is_empty() {
        println!("No observations for {station} in that window.");
        return Ok(());
    }

    for feature in &features {
        let obs = parse_observation(feature)?;
        let temperature = obs
            .temperature
            .map(|t| format!("{:.1} degC", t.celsius()))
            .unwrap_or_else(|| "-".to_string());
        let description = obs.text_description.as_deref().unwrap_or("-");
        println!(
            "{}  {:>10}  {}",
            obs.timestamp.format("%Y-%m-%d %H:%M UTC"),
            temperature,
            description,
        );
    }

    Ok(())
}

async fn show_alerts(area: Option<String>) -> anyhow::Result<()> {
    let client = client()?;
    let query = AlertsQuery {
        area,
        ..AlertsQuery::default()
    };
    let raw = client.get_alerts(&query).await?;
    let alerts = parse_alerts(&raw)?;

    if alerts.is_empty() {
        println!("No active alerts.");
        return Ok(());
    }

    for alert in &alerts {
        println!("{} ({}, {})", alert.event, alert.severity, alert.urgency);
        if let Some(headline) = &alert.headline {
            println!("  {headline}");
        }
        println!("  expires {}", alert.expires.format("%Y-%m-%d %H:%M UTC"));
    }

    Ok(())
}

fn parse_time_arg(flag: &str, value: Option<String>) -> anyhow::Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("{flag} must be an RFC 3339 timestamp, got {s:?}"))
        })
        .transpose()
}
