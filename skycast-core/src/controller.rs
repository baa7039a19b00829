//! Coordination of the current-weather and forecast lookups.
//!
//! [`WeatherFetchController`] owns two independent [`FetchState`] slices and
//! publishes a fresh [`WeatherSnapshot`] on every transition. Two consistency
//! policies coexist on purpose:
//!
//! - [`fetch_by_place`](WeatherFetchController::fetch_by_place) and
//!   [`fetch_by_coords`](WeatherFetchController::fetch_by_coords) issue both
//!   requests concurrently and let each one publish into its own slice as soon
//!   as it settles;
//! - [`refresh_with_current_query`](WeatherFetchController::refresh_with_current_query)
//!   joins both requests and publishes nothing but a shared error unless both
//!   succeed.
//!
//! Once [`teardown`](WeatherFetchController::teardown) has run, results that
//! arrive later are dropped without touching the snapshot.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    aggregate::aggregate,
    api::{ApiError, WeatherApi},
    language::Language,
    location::Geolocator,
    model::{CurrentConditions, DailySummary, Forecast, QuerySpec},
};

/// City used when no position can be determined at start-up.
pub const DEFAULT_FALLBACK_CITY: &str = "London";

/// Data, loading flag and last error of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self { data: None, loading: false, error: None }
    }
}

impl<T> FetchState<T> {
    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Settle the slice. A failure keeps whatever data was shown before.
    fn settle(&mut self, outcome: Result<T, ApiError>) {
        match outcome {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(err) => self.error = Some(err.to_string()),
        }
        self.loading = false;
    }
}

/// Read-only view handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSnapshot {
    pub current: FetchState<CurrentConditions>,
    pub forecast: FetchState<Forecast>,
    /// Set when a joint refresh fails.
    pub error: Option<String>,
}

impl WeatherSnapshot {
    pub fn loading(&self) -> bool {
        self.current.loading || self.forecast.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.current.error.as_deref())
            .or(self.forecast.error.as_deref())
    }

    /// The forecast grouped by day, at most five entries.
    pub fn daily(&self) -> Vec<DailySummary> {
        self.forecast.data.as_ref().map(|f| aggregate(&f.samples)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Current,
    Forecast,
}

#[derive(Debug, Default)]
struct Session {
    last_query: Option<QuerySpec>,
    language: Language,
    // bumped on every fetch; results from an older generation are stale
    generation: u64,
}

#[derive(Debug)]
pub struct WeatherFetchController {
    api: Arc<dyn WeatherApi>,
    state: watch::Sender<WeatherSnapshot>,
    session: Mutex<Session>,
    liveness: CancellationToken,
}

impl WeatherFetchController {
    pub fn new(api: Arc<dyn WeatherApi>, language: Language) -> Self {
        let (state, _) = watch::channel(WeatherSnapshot::default());

        Self {
            api,
            state,
            session: Mutex::new(Session { language, ..Session::default() }),
            liveness: CancellationToken::new(),
        }
    }

    pub fn snapshot(&self) -> WeatherSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<WeatherSnapshot> {
        self.state.subscribe()
    }

    pub fn language(&self) -> Language {
        self.session.lock().language
    }

    pub fn last_query(&self) -> Option<QuerySpec> {
        self.session.lock().last_query.clone()
    }

    pub fn is_live(&self) -> bool {
        !self.liveness.is_cancelled()
    }

    /// Signal that nobody cares about pending results any more.
    ///
    /// Taken under the snapshot lock so that no publication straddles it.
    pub fn teardown(&self) {
        self.state.send_if_modified(|_| {
            self.liveness.cancel();
            false
        });
        debug!("weather controller torn down");
    }

    pub async fn fetch_by_place(&self, name: impl Into<String>) {
        self.fetch(QuerySpec::place(name)).await;
    }

    pub async fn fetch_by_coords(&self, lat: f64, lon: f64) {
        self.fetch(QuerySpec::coords(lat, lon)).await;
    }

    /// Re-issue the last query as one joint operation.
    ///
    /// Both lookups must succeed for either slice to change; otherwise only
    /// the shared error is set. Does nothing before the first fetch.
    pub async fn refresh_with_current_query(&self) {
        if !self.is_live() {
            return;
        }

        let (query, language, generation) = {
            let session = self.session.lock();
            let Some(query) = session.last_query.clone() else {
                debug!("refresh requested before any lookup, ignoring");
                return;
            };
            (query, session.language, session.generation)
        };

        debug!(%query, %language, "refreshing with current query");

        // both requests run to completion even when one fails early
        let (current, forecast) = tokio::join!(
            self.api.current_weather(&query, language),
            self.api.forecast(&query, language),
        );
        let outcome = current.and_then(|current| forecast.map(|forecast| (current, forecast)));

        self.state.send_if_modified(|snapshot| {
            if self.liveness.is_cancelled() {
                return false;
            }
            if self.session.lock().generation != generation {
                debug!(%query, "newer lookup issued during refresh, dropping result");
                return false;
            }

            match outcome {
                Ok((current, forecast)) => {
                    snapshot.current.data = Some(current);
                    snapshot.current.error = None;
                    snapshot.forecast.data = Some(forecast);
                    snapshot.forecast.error = None;
                    snapshot.error = None;
                }
                Err(err) => {
                    warn!(%query, error = %err, "refresh failed");
                    snapshot.error = Some(err.to_string());
                }
            }
            true
        });
    }

    /// Switch the lookup language, refreshing the last query when it changed.
    pub async fn change_language(&self, language: Language) {
        let changed = {
            let mut session = self.session.lock();
            let changed = session.language != language;
            session.language = language;
            changed
        };

        if changed {
            debug!(%language, "language changed");
            self.refresh_with_current_query().await;
        }
    }

    /// Start-up lookup: the user's position if available, else `fallback_city`.
    pub async fn load_initial(&self, locator: &dyn Geolocator, fallback_city: &str) {
        match locator.locate().await {
            Ok(coords) => self.fetch_by_coords(coords.lat, coords.lon).await,
            Err(err) => {
                debug!(error = %err, fallback_city, "no position, using fallback city");
                self.fetch_by_place(fallback_city).await;
            }
        }
    }

    async fn fetch(&self, query: QuerySpec) {
        if !self.is_live() {
            return;
        }

        let (language, generation) = {
            let mut session = self.session.lock();
            session.last_query = Some(query.clone());
            session.generation += 1;
            (session.language, session.generation)
        };

        debug!(%query, %language, "fetching current weather and forecast");

        self.state.send_if_modified(|snapshot| {
            if self.liveness.is_cancelled() {
                return false;
            }
            snapshot.current.begin();
            snapshot.forecast.begin();
            snapshot.error = None;
            true
        });

        tokio::join!(
            self.load(
                Resource::Current,
                generation,
                self.api.current_weather(&query, language),
                |s| &mut s.current,
            ),
            self.load(
                Resource::Forecast,
                generation,
                self.api.forecast(&query, language),
                |s| &mut s.forecast,
            ),
        );
    }

    async fn load<T, Fut>(
        &self,
        resource: Resource,
        generation: u64,
        request: Fut,
        slot: fn(&mut WeatherSnapshot) -> &mut FetchState<T>,
    ) where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let outcome = request.await;

        if let Err(err) = &outcome {
            warn!(?resource, error = %err, "lookup failed");
        }

        self.state.send_if_modified(|snapshot| {
            if self.liveness.is_cancelled() {
                debug!(?resource, "controller torn down, dropping result");
                return false;
            }
            if self.session.lock().generation != generation {
                debug!(?resource, "superseded by a newer lookup, dropping result");
                return false;
            }

            slot(snapshot).settle(outcome);
            true
        });
    }
}
