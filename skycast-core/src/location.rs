use async_trait::async_trait;
use std::fmt::Debug;

use crate::model::Coordinates;

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    Unavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Source of the user's position for the initial lookup.
#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn locate(&self) -> Result<Coordinates, LocationError>;
}

/// A position known up front, e.g. the `[home]` table of the config file.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl Geolocator for FixedLocation {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl Geolocator for NoGeolocation {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unavailable)
    }
}

/// Pick the geolocator for an optional configured position.
pub fn geolocator_for(home: Option<Coordinates>) -> Box<dyn Geolocator> {
    match home {
        Some(coords) => Box::new(FixedLocation(coords)),
        None => Box::new(NoGeolocation),
    }
}
