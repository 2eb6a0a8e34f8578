//! Integration tests for WeatherApiClient and the proxy router.
//!
//! Upstream services are replaced by wiremock servers.

use std::net::SocketAddr;

use weather_proxy::{create_router, AppState, Config, WeatherApiClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn weather_json(name: &str) -> serde_json::Value {
    serde_json::json!({
        "clouds": { "all": 75 },
        "dt": 1_760_000_000,
        "main": {
            "feels_like": 6.1,
            "pressure": 1009,
            "humidity": 87,
            "temp": 8.3,
            "temp_min": 7.0,
            "temp_max": 9.4
        },
        "sys": { "sunrise": 1_759_990_000, "sunset": 1_760_030_000 },
        "weather": [{ "main": "Rain", "description": "light rain", "icon": "10d" }],
        "wind": { "speed": 6.2 },
        "name": name
    })
}

/// Serve the proxy on an ephemeral port and return its origin.
async fn spawn_proxy(config: Config) -> String {
    let app = create_router(AppState::from_config(config).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_client_caches_city_lookups() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/weather"))
        .and(query_param("city", "Bergen"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json("Bergen")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = WeatherApiClient::new(&mock_server.uri()).unwrap();

    let first = client.weather_by_city("Bergen").await.unwrap();
    let second = client.weather_by_city("Bergen").await.unwrap();

    assert_eq!(first.display_name(), "Bergen");
    assert_eq!(second.main.temp, first.main.temp);
}

#[tokio::test]
async fn test_client_clear_cache_forces_refetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/weather"))
        .and(query_param("lat", "60.39"))
        .and(query_param("lon", "5.32"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json("Bergen")))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = WeatherApiClient::new(&mock_server.uri()).unwrap();

    client.weather_by_coords(60.39, 5.32, "imperial").await.unwrap();
    client.clear_cache().await;
    client.weather_by_coords(60.39, 5.32, "imperial").await.unwrap();
}

#[tokio::test]
async fn test_client_surfaces_error_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/weather"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": "City \"Atlantis\" not found"
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = WeatherApiClient::new(&mock_server.uri()).unwrap();

    let err = client.weather_by_city("Atlantis").await.unwrap_err();
    assert_eq!(err.to_string(), "City \"Atlantis\" not found");

    // Failures are never cached.
    assert!(client.weather_by_city("Atlantis").await.is_err());
}

#[tokio::test]
async fn test_client_error_without_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/weather"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = WeatherApiClient::new(&mock_server.uri()).unwrap();
    let err = client.weather_by_coords(1.0, 2.0, "metric").await.unwrap_err();

    assert_eq!(err.to_string(), "API error: 503 Service Unavailable");
}

#[tokio::test]
async fn test_end_to_end_city_lookup() {
    let upstream = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Bergen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "Bergen", "lat": 60.39, "lon": 5.32, "country": "NO" }
        ])))
        .expect(1)
        .mount(&upstream)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "60.39"))
        .and(query_param("lon", "5.32"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "integration-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json("Nordnes")))
        .expect(1)
        .mount(&upstream)
        .await;

    let proxy = spawn_proxy(Config {
        openweather_api_key: Some("integration-key".to_string()),
        openweather_base_url: upstream.uri(),
        ..Config::default()
    })
    .await;

    let client = WeatherApiClient::new(&proxy).unwrap();
    let data = client.weather_by_city("Bergen").await.unwrap();

    assert_eq!(data.display_name(), "Bergen");
    assert_eq!(data.name, "Bergen");
    assert_eq!(data.main.humidity, 87.0);

    // A second client has an empty cache, so this one is served by the proxy's cache.
    let other = WeatherApiClient::new(&proxy).unwrap();
    let again = other.weather_by_city("Bergen").await.unwrap();
    assert_eq!(again.display_name(), "Bergen");
}

#[tokio::test]
async fn test_end_to_end_rate_limit_by_socket_address() {
    let upstream = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json("Somewhere")))
        .mount(&upstream)
        .await;

    let proxy = spawn_proxy(Config {
        openweather_api_key: Some("integration-key".to_string()),
        openweather_base_url: upstream.uri(),
        rate_limit_max_requests: 1,
        ..Config::default()
    })
    .await;

    let first = WeatherApiClient::new(&proxy).unwrap();
    first.weather_by_coords(1.0, 2.0, "metric").await.unwrap();

    let second = WeatherApiClient::new(&proxy).unwrap();
    let err = second.weather_by_coords(1.0, 2.0, "metric").await.unwrap_err();
    assert_eq!(err.to_string(), "Rate limit exceeded. Try again later.");
}
