//! Core library for the `skycast` weather lookup.
//!
//! This crate defines:
//! - Grouping of the 3-hour forecast feed into daily summaries
//! - The fetch controller that owns current/forecast lookup state
//! - The weather gateway transport with its retry and token-refresh policy
//! - Configuration, language mapping and geolocation sources
//!
//! It is used by `skycast-cli`, but can also back other front ends.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod controller;
pub mod language;
pub mod location;
pub mod model;

pub use aggregate::{MAX_FORECAST_DAYS, aggregate};
pub use api::{ApiError, HttpWeatherApi, RetryPolicy, TokenStore, TransportPolicy, WeatherApi};
pub use config::Config;
pub use controller::{FetchState, WeatherFetchController, WeatherSnapshot};
pub use language::Language;
pub use location::{Geolocator, LocationError};
pub use model::{
    Condition, Coordinates, CurrentConditions, DailySummary, Forecast, QuerySpec, WeatherSample,
};
