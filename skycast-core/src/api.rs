use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt::Debug;

use crate::{
    language::Language,
    model::{CurrentConditions, Forecast, QuerySpec},
};

pub mod auth;
pub mod gateway;
pub mod retry;

pub use auth::{TokenPair, TokenStore};
pub use gateway::{HttpWeatherApi, TransportPolicy};
pub use retry::RetryPolicy;

/// Everything that can go wrong between the controller and the upstream gateway.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Failed to reach weather service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Weather service responded with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Unexpected weather service payload: {0}")]
    Decode(String),

    #[error("Session expired; sign in again")]
    Unauthorized,
}

/// The weather lookups the fetch controller depends on.
#[async_trait]
pub trait WeatherApi: Send + Sync + Debug {
    async fn current_weather(
        &self,
        query: &QuerySpec,
        language: Language,
    ) -> Result<CurrentConditions, ApiError>;

    async fn forecast(&self, query: &QuerySpec, language: Language) -> Result<Forecast, ApiError>;
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
