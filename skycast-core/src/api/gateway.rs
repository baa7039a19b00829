use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    ApiError, WeatherApi,
    auth::{RefreshResponse, TokenStore},
    retry::{RetryPolicy, is_retryable_error, is_retryable_status},
    truncate_body,
};
use crate::{
    language::Language,
    model::{Condition, CurrentConditions, Forecast, QuerySpec, WeatherSample},
};

const CURRENT_PATH: &str = "/api/v1/weather/current";
const FORECAST_PATH: &str = "/api/v1/weather/forecast";
const REFRESH_PATH: &str = "/api/v1/auth/refresh";

const FEED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How the gateway client reacts to transient failures and expired tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicy {
    pub retry: RetryPolicy,
    /// Trade the refresh token for a new access token once on `401`.
    pub refresh_on_unauthorized: bool,
}

impl Default for TransportPolicy {
    fn default() -> Self {
        Self { retry: RetryPolicy::default(), refresh_on_unauthorized: true }
    }
}

/// [`WeatherApi`] backed by the weather gateway's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpWeatherApi {
    base_url: String,
    http: Client,
    policy: TransportPolicy,
    tokens: TokenStore,
}

impl HttpWeatherApi {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        policy: TransportPolicy,
        tokens: TokenStore,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http, policy, tokens })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn query_params(query: &QuerySpec, language: Language) -> Vec<(&'static str, String)> {
        let mut params = match query {
            QuerySpec::Place { name } => vec![("city", name.clone())],
            QuerySpec::Coords { lat, lon } => vec![("lat", lat.to_string()), ("lon", lon.to_string())],
        };
        params.push(("lang", language.api_code().to_string()));
        params
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        let body = self.get_authorized(path, params).await?;

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
    }

    async fn get_authorized(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<String, ApiError> {
        let mut response = self.send_with_retry(path, params).await?;

        if response.status() == StatusCode::UNAUTHORIZED
            && self.policy.refresh_on_unauthorized
            && self.tokens.refresh_token().is_some()
        {
            debug!(path, "access token rejected, refreshing");
            self.refresh_tokens().await?;
            response = self.send_with_retry(path, params).await?;
        }

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::Status { status, body: truncate_body(&body) });
        }

        Ok(body)
    }

    async fn send_with_retry(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<Response, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let retry = self.policy.retry;
        let mut attempt = 0;

        loop {
            let mut request = self.http.get(&url).query(params);
            if let Some(token) = self.tokens.access_token() {
                request = request.bearer_auth(token);
            }

            let outcome = request.send().await;
            let retryable = match &outcome {
                Ok(res) => is_retryable_status(res.status()),
                Err(err) => is_retryable_error(err),
            };

            if !retryable || attempt >= retry.max_retries {
                return outcome.map_err(ApiError::from);
            }

            let delay = retry.delay_for_attempt(attempt);
            attempt += 1;
            warn!(
                path,
                attempt,
                max_retries = retry.max_retries,
                ?delay,
                "transient gateway failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn refresh_tokens(&self) -> Result<(), ApiError> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            return Err(ApiError::Unauthorized);
        };

        let url = format!("{}{REFRESH_PATH}", self.base_url);
        let refreshed = match self
            .http
            .post(&url)
            .query(&[("refreshToken", refresh_token.as_str())])
            .send()
            .await
        {
            Ok(res) if res.status().is_success() => res.json::<RefreshResponse>().await.ok(),
            Ok(res) => {
                warn!(status = %res.status(), "token refresh rejected");
                None
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed");
                None
            }
        };

        match refreshed {
            Some(tokens) => {
                self.tokens.replace(tokens.access_token, tokens.refresh_token);
                Ok(())
            }
            None => {
                self.tokens.clear();
                Err(ApiError::Unauthorized)
            }
        }
    }
}

#[async_trait]
impl WeatherApi for HttpWeatherApi {
    async fn current_weather(
        &self,
        query: &QuerySpec,
        language: Language,
    ) -> Result<CurrentConditions, ApiError> {
        debug!(%query, %language, "requesting current weather");
        let params = Self::query_params(query, language);
        let parsed: GwCurrentResponse = self.get_json(CURRENT_PATH, &params).await?;
        Ok(parsed.into_domain())
    }

    async fn forecast(&self, query: &QuerySpec, language: Language) -> Result<Forecast, ApiError> {
        debug!(%query, %language, "requesting forecast");
        let params = Self::query_params(query, language);
        let parsed: GwForecastResponse = self.get_json(FORECAST_PATH, &params).await?;
        parsed.into_domain()
    }
}

#[derive(Debug, Deserialize)]
struct GwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    #[serde(default)]
    feels_like: Option<f64>,
    #[serde(default)]
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct GwWeather {
    icon: String,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct GwWind {
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct GwSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GwCurrentResponse {
    name: String,
    dt: i64,
    main: GwMain,
    weather: Vec<GwWeather>,
    #[serde(default)]
    wind: GwWind,
    #[serde(default)]
    sys: GwSys,
    visibility: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GwCity {
    name: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GwForecastEntry {
    dt_txt: String,
    main: GwMain,
    weather: Vec<GwWeather>,
}

#[derive(Debug, Deserialize)]
struct GwForecastResponse {
    city: Option<GwCity>,
    list: Vec<GwForecastEntry>,
}

fn first_condition(weather: &[GwWeather]) -> Condition {
    weather
        .first()
        .map(|w| Condition::new(w.icon.clone(), w.description.clone()))
        .unwrap_or_else(|| Condition::new("", "Unknown"))
}

impl GwCurrentResponse {
    fn into_domain(self) -> CurrentConditions {
        let condition = first_condition(&self.weather);
        let observed_at = DateTime::<Utc>::from_timestamp(self.dt, 0).unwrap_or_else(Utc::now);

        CurrentConditions {
            location: self.name,
            country: self.sys.country,
            temperature: self.main.temp,
            feels_like: self.main.feels_like.unwrap_or(self.main.temp),
            temperature_min: self.main.temp_min,
            temperature_max: self.main.temp_max,
            humidity: self.main.humidity.unwrap_or_default(),
            wind_speed: self.wind.speed,
            visibility_m: self.visibility,
            condition,
            observed_at,
        }
    }
}

impl GwForecastResponse {
    fn into_domain(self) -> Result<Forecast, ApiError> {
        let samples = self
            .list
            .into_iter()
            .map(|entry| {
                let timestamp = NaiveDateTime::parse_from_str(&entry.dt_txt, FEED_TIMESTAMP_FORMAT)
                    .map_err(|e| {
                        ApiError::Decode(format!("invalid forecast time '{}': {e}", entry.dt_txt))
                    })?;

                Ok(WeatherSample {
                    timestamp,
                    temperature: entry.main.temp,
                    temperature_min: entry.main.temp_min,
                    temperature_max: entry.main.temp_max,
                    condition: first_condition(&entry.weather),
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        let (city, country) = match self.city {
            Some(c) => (c.name, c.country),
            None => (None, None),
        };

        Ok(Forecast { city, country, samples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_query_params() {
        let params = HttpWeatherApi::query_params(&QuerySpec::place("São Paulo"), Language::Korean);
        assert_eq!(
            params,
            vec![("city", "São Paulo".to_string()), ("lang", "kr".to_string())]
        );
    }

    #[test]
    fn coords_query_params() {
        let params = HttpWeatherApi::query_params(&QuerySpec::coords(51.5, -0.12), Language::English);
        assert_eq!(
            params,
            vec![
                ("lat", "51.5".to_string()),
                ("lon", "-0.12".to_string()),
                ("lang", "en".to_string())
            ]
        );
    }

    #[test]
    fn current_payload_maps_to_domain() {
        let json = r#"{
            "name": "Lisbon",
            "dt": 1717236000,
            "main": {"temp": 21.4, "feels_like": 20.9, "temp_min": 19.0, "temp_max": 23.1, "humidity": 60},
            "weather": [{"icon": "01d", "description": "céu limpo"}],
            "wind": {"speed": 4.1},
            "sys": {"country": "PT"},
            "visibility": 10000
        }"#;

        let parsed: GwCurrentResponse = serde_json::from_str(json).unwrap();
        let current = parsed.into_domain();

        assert_eq!(current.location, "Lisbon");
        assert_eq!(current.country.as_deref(), Some("PT"));
        assert_eq!(current.humidity, 60);
        assert_eq!(current.visibility_m, Some(10000));
        assert_eq!(current.condition, Condition::new("01d", "céu limpo"));
        assert_eq!(current.observed_at.timestamp(), 1717236000);
    }

    #[test]
    fn missing_weather_entry_is_unknown() {
        let json = r#"{
            "name": "Nowhere",
            "dt": 0,
            "main": {"temp": 1.0, "temp_min": 0.0, "temp_max": 2.0},
            "weather": []
        }"#;

        let current = serde_json::from_str::<GwCurrentResponse>(json).unwrap().into_domain();
        assert_eq!(current.condition.description, "Unknown");
        assert_eq!(current.feels_like, 1.0);
        assert_eq!(current.wind_speed, 0.0);
    }

    #[test]
    fn forecast_payload_keeps_feed_order() {
        let json = r#"{
            "city": {"name": "Paris", "country": "FR"},
            "list": [
                {"dt_txt": "2024-06-02 00:00:00", "main": {"temp": 14.0, "temp_min": 13.0, "temp_max": 15.0}, "weather": [{"icon": "04n", "description": "nuageux"}]},
                {"dt_txt": "2024-06-01 21:00:00", "main": {"temp": 16.0, "temp_min": 15.5, "temp_max": 16.2}, "weather": [{"icon": "01n", "description": "ciel dégagé"}]}
            ]
        }"#;

        let forecast =
            serde_json::from_str::<GwForecastResponse>(json).unwrap().into_domain().unwrap();

        assert_eq!(forecast.city.as_deref(), Some("Paris"));
        assert_eq!(forecast.samples.len(), 2);
        assert_eq!(forecast.samples[0].timestamp.to_string(), "2024-06-02 00:00:00");
        assert_eq!(forecast.samples[1].condition.code, "01n");
    }

    #[test]
    fn malformed_forecast_time_is_decode_error() {
        let json = r#"{
            "list": [
                {"dt_txt": "2024-06-02T00:00:00Z", "main": {"temp": 1.0, "temp_min": 1.0, "temp_max": 1.0}, "weather": []}
            ]
        }"#;

        let err = serde_json::from_str::<GwForecastResponse>(json).unwrap().into_domain().unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert!(err.to_string().contains("2024-06-02T00:00:00Z"));
    }
}
