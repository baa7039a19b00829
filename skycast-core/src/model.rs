use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider icon code plus the localized description that goes with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub code: String,
    pub description: String,
}

impl Condition {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self { code: code.into(), description: description.into() }
    }
}

/// One point of the 3-hour forecast feed.
///
/// `timestamp` is the feed-local time exactly as the provider reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location: String,
    pub country: Option<String>,
    pub temperature: f64,
    pub feels_like: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub visibility_m: Option<u32>,
    pub condition: Condition,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub city: Option<String>,
    pub country: Option<String>,
    pub samples: Vec<WeatherSample>,
}

/// Min/max/condition view over one calendar day of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Shape of the last successful request, replayed on a language change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuerySpec {
    Place { name: String },
    Coords { lat: f64, lon: f64 },
}

impl QuerySpec {
    pub fn place(name: impl Into<String>) -> Self {
        QuerySpec::Place { name: name.into() }
    }

    pub fn coords(lat: f64, lon: f64) -> Self {
        QuerySpec::Coords { lat, lon }
    }
}

impl From<Coordinates> for QuerySpec {
    fn from(c: Coordinates) -> Self {
        QuerySpec::Coords { lat: c.lat, lon: c.lon }
    }
}

impl std::fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuerySpec::Place { name } => f.write_str(name),
            QuerySpec::Coords { lat, lon } => write!(f, "{lat:.4},{lon:.4}"),
        }
    }
}
