//! HTTP-level tests for the dispatch contract, against a local mock
//! server. Mock expectations are verified when each server drops, so an
//! `.expect(1)` mock doubles as a transport-call counter.

use chrono::TimeZone;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nws_core::{AlertsQuery, ClientConfig, NwsClient, NwsError, parse_forecast};

const TEST_USER_AGENT: &str = "nws-core-tests/0.1 (tests@example.com)";

fn client_for(server: &MockServer) -> NwsClient {
    let config = ClientConfig::new()
        .with_user_agent(TEST_USER_AGENT)
        .with_base_url(server.uri())
        .with_timeout(1)
        .with_cache_ttl(600);
    NwsClient::new(config).expect("client builds")
}

fn forecast_body() -> serde_json::Value {
    json!({
        "properties": {
            "updated": "2025-03-01T10:00:00+00:00",
            "periods": [{
                "name": "Today",
                "startTime": "2025-03-01T06:00:00-06:00",
                "endTime": "2025-03-01T18:00:00-06:00",
                "temperature": 45,
                "temperatureUnit": "F",
                "windSpeed": "10 mph",
                "windDirection": "NW",
                "shortForecast": "Sunny",
                "detailedForecast": "Sunny, with a high near 45."
            }]
        }
    })
}

#[tokio::test]
async fn points_sends_identifying_header_and_formatted_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/points/39.7456,-97.0892"))
        .and(header("user-agent", TEST_USER_AGENT))
        .and(header("accept", "application/geo+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"gridId": "TOP"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let points = client.get_points(39.7456, -97.0892).await.expect("points");
    assert_eq!(points["properties"]["gridId"], "TOP");
}

#[tokio::test]
async fn status_404_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_glossary().await.unwrap_err();
    assert!(matches!(err, NwsError::NotFound(_)));
}

#[tokio::test]
async fn status_429_maps_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_glossary().await.unwrap_err();
    assert!(matches!(err, NwsError::RateLimited));
}

#[tokio::test]
async fn other_statuses_carry_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream melted"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_glossary().await.unwrap_err();
    match err {
        NwsError::Api { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("upstream melted"));
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_success_body_is_an_error_not_a_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_glossary().await.unwrap_err();
    match err {
        NwsError::Api { status, message } => {
            assert_eq!(status, 200);
            assert!(message.contains("not valid JSON"));
        }
        other => panic!("expected Api, got {other:?}"),
    }
    // Nothing got cached on the failure path.
    assert_eq!(client.cache_entry_count(), 0);
}

#[tokio::test]
async fn slow_responses_classify_as_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_glossary().await.unwrap_err();
    assert!(matches!(err, NwsError::Timeout(1)));
}

#[tokio::test]
async fn identical_requests_reach_transport_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/points/39.7456,-97.0892"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"gridId": "TOP"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let first = client.get_points(39.7456, -97.0892).await.expect("first");
    let second = client.get_points(39.7456, -97.0892).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(client.cache_entry_count(), 1);

    // After an explicit clear the next call goes back to transport.
    client.clear_cache();
    assert_eq!(client.cache_entry_count(), 0);
}

#[tokio::test]
async fn out_of_range_coordinates_never_touch_transport() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client.get_points(90.5, 0.0).await.unwrap_err();
    assert!(matches!(err, NwsError::Validation(_)));

    let err = client.get_points(0.0, 181.0).await.unwrap_err();
    assert!(matches!(err, NwsError::Validation(_)));

    let err = client.get_forecast(-91.0, 0.0).await.unwrap_err();
    assert!(matches!(err, NwsError::Validation(_)));
}

#[tokio::test]
async fn alerts_include_active_by_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/alerts"))
        .and(query_param("active", "true"))
        .and(query_param("area", "KS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let query = AlertsQuery {
        area: Some("KS".to_string()),
        ..AlertsQuery::default()
    };
    client.get_alerts(&query).await.expect("alerts");
}

#[tokio::test]
async fn caller_supplied_active_false_omits_the_filter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/alerts"))
        .and(query_param("area", "KS"))
        .and(query_param_is_missing("active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let query = AlertsQuery {
        area: Some("KS".to_string()),
        active: Some(false),
        ..AlertsQuery::default()
    };
    client.get_alerts(&query).await.expect("alerts");
}

#[tokio::test]
async fn observation_bounds_serialize_with_literal_z() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stations/KBOS/observations"))
        .and(query_param("start", "2025-03-01T06:30:00Z"))
        .and(query_param("end", "2025-03-01T18:30:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let start = chrono::Utc.with_ymd_and_hms(2025, 3, 1, 6, 30, 0).unwrap();
    let end = chrono::Utc.with_ymd_and_hms(2025, 3, 1, 18, 30, 0).unwrap();
    client
        .get_station_observations("KBOS", Some(start), Some(end))
        .await
        .expect("observations");
}

#[tokio::test]
async fn products_default_limit_is_50() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"@graph": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .get_products(None, None, None, None)
        .await
        .expect("products");
}

#[tokio::test]
async fn forecast_chains_through_points_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/points/39.7456,-97.0892"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {
                "forecast": format!("{}/gridpoints/TOP/31,80/forecast", server.uri()),
                "forecastHourly": format!("{}/gridpoints/TOP/31,80/forecast/hourly", server.uri())
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gridpoints/TOP/31,80/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let raw = client.get_forecast(39.7456, -97.0892).await.expect("forecast");

    let forecast = parse_forecast(&raw).expect("typed forecast");
    assert_eq!(forecast.today().expect("today").name, "Today");
}

#[tokio::test]
async fn point_resolution_failure_propagates_through_forecast() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/points/10.0000,10.0000"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_forecast(10.0, 10.0).await.unwrap_err();
    assert!(matches!(err, NwsError::NotFound(_)));
}

#[tokio::test]
async fn forecast_url_missing_from_points_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/points/10.0000,10.0000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"properties": {}})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_forecast(10.0, 10.0).await.unwrap_err();
    match err {
        NwsError::NotFound(message) => assert!(message.contains("forecast")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn grid_forecast_builds_hourly_variant() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gridpoints/TOP/31,80/forecast/hourly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .get_grid_forecast("TOP", 31, 80, true)
        .await
        .expect("hourly grid forecast");
}
