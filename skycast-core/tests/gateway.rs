//! HttpWeatherApi against a mock weather gateway.

use std::time::Duration;

use serde_json::json;
use skycast_core::{
    ApiError, HttpWeatherApi, Language, QuerySpec, RetryPolicy, TokenStore, TransportPolicy,
    WeatherApi, aggregate, api::TokenPair,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn current_body(name: &str, description: &str) -> serde_json::Value {
    json!({
        "name": name,
        "dt": 1717243200,
        "main": {"temp": 18.6, "feels_like": 18.1, "temp_min": 17.0, "temp_max": 20.2, "humidity": 72},
        "weather": [{"icon": "03d", "description": description}],
        "wind": {"speed": 5.4},
        "sys": {"country": "GB"},
        "visibility": 9000
    })
}

fn entry(dt_txt: &str, temp: f64, min: f64, max: f64, icon: &str) -> serde_json::Value {
    json!({
        "dt_txt": dt_txt,
        "main": {"temp": temp, "temp_min": min, "temp_max": max},
        "weather": [{"icon": icon, "description": icon}]
    })
}

fn fast_policy() -> TransportPolicy {
    TransportPolicy {
        retry: RetryPolicy { max_retries: 2, initial_delay_ms: 1, max_delay_ms: 5 },
        refresh_on_unauthorized: true,
    }
}

fn client(server: &MockServer, tokens: TokenStore) -> HttpWeatherApi {
    HttpWeatherApi::new(&server.uri(), Duration::from_secs(5), fast_policy(), tokens).unwrap()
}

#[tokio::test]
async fn current_by_city_sends_city_and_language() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/current"))
        .and(query_param("city", "London"))
        .and(query_param("lang", "pt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("London", "nublado")))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, TokenStore::default());
    let current =
        api.current_weather(&QuerySpec::place("London"), Language::Portuguese).await.unwrap();

    assert_eq!(current.location, "London");
    assert_eq!(current.country.as_deref(), Some("GB"));
    assert_eq!(current.condition.description, "nublado");
    assert_eq!(current.humidity, 72);
}

#[tokio::test]
async fn forecast_by_coords_maps_samples() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/forecast"))
        .and(query_param("lat", "51.5"))
        .and(query_param("lon", "-0.12"))
        .and(query_param("lang", "zh_cn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "city": {"name": "London", "country": "GB"},
            "list": [
                entry("2024-06-01 09:00:00", 14.0, 13.0, 15.0, "04d"),
                entry("2024-06-01 15:00:00", 19.0, 18.0, 20.0, "01d"),
                entry("2024-06-02 09:00:00", 12.0, 11.0, 13.0, "10d"),
            ]
        })))
        .mount(&server)
        .await;

    let api = client(&server, TokenStore::default());
    let forecast =
        api.forecast(&QuerySpec::coords(51.5, -0.12), Language::Chinese).await.unwrap();

    assert_eq!(forecast.samples.len(), 3);
    let daily = aggregate(&forecast.samples);
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0].condition.code, "01d");
    assert_eq!(daily[0].temperature_max, 20.0);
}

#[tokio::test]
async fn not_found_is_status_error_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/current"))
        .respond_with(ResponseTemplate::new(404).set_body_string("city not found"))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, TokenStore::default());
    let err = api
        .current_weather(&QuerySpec::place("Atlantis"), Language::English)
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(body, "city not found");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/current"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("London", "rain")))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, TokenStore::default());
    let current =
        api.current_weather(&QuerySpec::place("London"), Language::English).await.unwrap();

    assert_eq!(current.condition.description, "rain");
}

#[tokio::test]
async fn retries_give_up_after_policy_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/forecast"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(3)
        .mount(&server)
        .await;

    let api = client(&server, TokenStore::default());
    let err = api.forecast(&QuerySpec::place("London"), Language::English).await.unwrap_err();

    assert!(matches!(err, ApiError::Status { .. }));
    assert!(err.to_string().contains("502"));
}

#[tokio::test]
async fn malformed_payload_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let api = client(&server, TokenStore::default());
    let err = api.forecast(&QuerySpec::place("London"), Language::English).await.unwrap_err();

    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn attaches_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/current"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("London", "clear")))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::new(TokenPair { access_token: Some("abc".into()), refresh_token: None });
    let api = client(&server, tokens);

    api.current_weather(&QuerySpec::place("London"), Language::English).await.unwrap();
}

#[tokio::test]
async fn expired_token_is_refreshed_once_and_request_replayed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/current"))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(query_param("refreshToken", "r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "new",
            "refreshToken": "r2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/current"))
        .and(header("Authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("London", "clear")))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::new(TokenPair {
        access_token: Some("old".into()),
        refresh_token: Some("r1".into()),
    });
    let api = client(&server, tokens.clone());

    let current =
        api.current_weather(&QuerySpec::place("London"), Language::English).await.unwrap();

    assert_eq!(current.location, "London");
    assert_eq!(tokens.access_token().as_deref(), Some("new"));
    assert_eq!(tokens.refresh_token().as_deref(), Some("r2"));
}

#[tokio::test]
async fn failed_refresh_clears_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/current"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::new(TokenPair {
        access_token: Some("old".into()),
        refresh_token: Some("stale".into()),
    });
    let api = client(&server, tokens.clone());

    let err = api
        .current_weather(&QuerySpec::place("London"), Language::English)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(tokens.access_token(), None);
    assert_eq!(tokens.refresh_token(), None);
}

#[tokio::test]
async fn unauthorized_without_refresh_token_fails_fast() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/weather/forecast"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, TokenStore::default());
    let err = api.forecast(&QuerySpec::place("London"), Language::English).await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
}
