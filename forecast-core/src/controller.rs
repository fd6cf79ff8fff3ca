//! Preference-driven forecast refresh.
//!
//! [`ForecastController`] runs a single task that owns all visible state. It
//! listens to preference snapshots and location fixes, reduces them to a
//! [`QueryKey`] and issues one fetch each time that key changes. Fetches run
//! on their own tasks and report back tagged with the generation they were
//! issued for; a result whose generation is not the latest is dropped, so a
//! slow response for a superseded key can never overwrite newer state.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    error::FetchError,
    location::{LocationProvider, LocationStatus},
    model::{Coordinates, ForecastResponse, Preferences},
    provider::{ForecastClient, ForecastQuery},
    updates::Updates,
};

/// Request selected by the current inputs.
///
/// Coordinates win only when location fetching is on and a real fix exists.
pub fn effective_query(preferences: &Preferences, coordinates: Coordinates) -> ForecastQuery {
    if preferences.fetch_by_location && !coordinates.is_sentinel() {
        ForecastQuery::Coordinates(coordinates)
    } else {
        ForecastQuery::City(preferences.city_name.clone())
    }
}

/// Inputs that decide whether a new fetch is due.
///
/// Coordinates only take part while fetching by location, and then even the
/// sentinel counts, so switching modes or editing the city always refetches.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryKey {
    city_name: String,
    fetch_by_location: bool,
    coordinates: Option<Coordinates>,
}

impl QueryKey {
    pub fn new(preferences: &Preferences, coordinates: Coordinates) -> Self {
        Self {
            city_name: preferences.city_name.clone(),
            fetch_by_location: preferences.fetch_by_location,
            coordinates: preferences.fetch_by_location.then_some(coordinates),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastState {
    Idle(Option<Arc<ForecastResponse>>),
    Loading(Option<Arc<ForecastResponse>>),
    Loaded(Arc<ForecastResponse>),
    /// Last fetch failed; the previous forecast, if any, is kept for display.
    Failed(Option<Arc<ForecastResponse>>),
}

impl ForecastState {
    /// Forecast to display, including one retained across a refresh or failure.
    pub fn forecast(&self) -> Option<&Arc<ForecastResponse>> {
        match self {
            Self::Loaded(f) => Some(f),
            Self::Idle(f) | Self::Loading(f) | Self::Failed(f) => f.as_ref(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// User-facing notices raised by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    LocationPermissionRequired,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Self::LocationPermissionRequired => {
                "This feature requires permission to use your location"
            }
        }
    }
}

/// Everything a view needs to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: ForecastState,
    pub preferences: Preferences,
    pub advisory: Option<Advisory>,
}

impl Snapshot {
    pub fn forecast(&self) -> Option<&ForecastResponse> {
        self.state.forecast().map(|f| f.as_ref())
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn dark_theme(&self) -> bool {
        self.preferences.is_dark_theme
    }
}

/// A fetch the machine wants issued.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub generation: u64,
    pub query: ForecastQuery,
}

/// The refresh state machine without any I/O.
#[derive(Debug)]
pub struct RefreshMachine {
    generation: u64,
    key: Option<QueryKey>,
    state: ForecastState,
}

impl Default for RefreshMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshMachine {
    pub fn new() -> Self {
        Self {
            generation: 0,
            key: None,
            state: ForecastState::Loading(None),
        }
    }

    pub fn state(&self) -> &ForecastState {
        &self.state
    }

    /// Feed the latest inputs. Returns a request when the key changed.
    pub fn on_inputs(
        &mut self,
        preferences: &Preferences,
        coordinates: Coordinates,
    ) -> Option<FetchRequest> {
        let key = QueryKey::new(preferences, coordinates);
        if self.key.as_ref() == Some(&key) {
            debug!(?key, "query key unchanged");
            return None;
        }

        self.generation += 1;
        self.key = Some(key);
        self.state = ForecastState::Loading(self.state.forecast().cloned());

        Some(FetchRequest {
            generation: self.generation,
            query: effective_query(preferences, coordinates),
        })
    }

    /// Apply a fetch result. Returns `false` when it belonged to a superseded key.
    pub fn on_result(
        &mut self,
        generation: u64,
        result: Result<ForecastResponse, FetchError>,
    ) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale forecast result");
            return false;
        }

        self.state = match result {
            Ok(forecast) => {
                info!(city = %forecast.city.name, entries = forecast.list.len(), "forecast loaded");
                ForecastState::Loaded(Arc::new(forecast))
            }
            Err(err) => {
                if err.is_network() {
                    warn!(error = %err, "forecast fetch failed: network");
                } else {
                    warn!(error = %err, "forecast fetch failed: provider");
                }
                ForecastState::Failed(self.state.forecast().cloned())
            }
        };
        true
    }

    /// Teardown: keep the last forecast, stop accepting results.
    pub fn shut_down(&mut self) {
        self.generation += 1;
        self.state = ForecastState::Idle(self.state.forecast().cloned());
    }
}

/// Handle to a running refresh task.
///
/// Dropping the handle tears the task down as well; [`ForecastController::shutdown`]
/// additionally waits for it to finish.
#[derive(Debug)]
pub struct ForecastController {
    snapshot: watch::Receiver<Snapshot>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ForecastController {
    /// Start the refresh task on the current tokio runtime.
    pub fn spawn(
        preferences: Updates<Preferences>,
        location: Arc<dyn LocationProvider>,
        client: Arc<dyn ForecastClient>,
    ) -> Self {
        let initial = Snapshot {
            state: ForecastState::Loading(None),
            preferences: preferences.latest(),
            advisory: None,
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = Worker {
            machine: RefreshMachine::new(),
            location,
            client,
            snapshot: snapshot_tx,
            advisory: None,
        };
        let task = tokio::spawn(worker.run(preferences, shutdown_rx));

        Self {
            snapshot: snapshot_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Current state, without waiting.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Current snapshot first, then one per transition.
    pub fn subscribe(&self) -> Updates<Snapshot> {
        Updates::new(self.snapshot.clone())
    }

    /// Stop location updates, drop the preference subscription and wait for the task.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            warn!(error = %err, "forecast controller task ended abnormally");
        }
    }
}

struct Worker {
    machine: RefreshMachine,
    location: Arc<dyn LocationProvider>,
    client: Arc<dyn ForecastClient>,
    snapshot: watch::Sender<Snapshot>,
    advisory: Option<Advisory>,
}

type FetchOutcome = (u64, Result<ForecastResponse, FetchError>);

impl Worker {
    async fn run(
        mut self,
        mut preferences: Updates<Preferences>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let (results_tx, mut results_rx) = mpsc::unbounded_channel::<FetchOutcome>();

        let Some(mut prefs) = preferences.next().await else {
            warn!("preference store closed before the first snapshot");
            self.finish(Preferences::default());
            return;
        };
        if prefs.fetch_by_location {
            self.request_location();
        }

        let mut coordinates = self.location.current_coordinates();
        let mut coords = coordinates.next().await.unwrap_or_default();

        self.refresh(&prefs, coords, &results_tx);

        let mut prefs_open = true;
        let mut coords_open = true;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                Some((generation, result)) = results_rx.recv() => {
                    if self.machine.on_result(generation, result) {
                        self.publish(&prefs);
                    }
                }

                next = preferences.next(), if prefs_open => match next {
                    Some(next) => {
                        if next.fetch_by_location && !prefs.fetch_by_location {
                            self.request_location();
                        } else if !next.fetch_by_location {
                            self.advisory = None;
                        }
                        prefs = next;
                        self.refresh(&prefs, coords, &results_tx);
                    }
                    None => {
                        debug!("preference stream closed");
                        prefs_open = false;
                    }
                },

                next = coordinates.next(), if coords_open => match next {
                    Some(next) => {
                        debug!(position = %next, "location fix");
                        coords = next;
                        self.refresh(&prefs, coords, &results_tx);
                    }
                    None => {
                        debug!("location stream closed");
                        coords_open = false;
                    }
                },
            }
        }

        self.finish(prefs);
    }

    fn request_location(&mut self) {
        self.advisory = match self.location.request_updates() {
            LocationStatus::PermissionDenied => Some(Advisory::LocationPermissionRequired),
            LocationStatus::Started | LocationStatus::AlreadyActive => None,
        };
    }

    /// Recompute the key; issue a fetch if it changed. Always republishes so
    /// preference-only edits (theme) reach subscribers.
    fn refresh(
        &mut self,
        prefs: &Preferences,
        coords: Coordinates,
        results: &mpsc::UnboundedSender<FetchOutcome>,
    ) {
        if let Some(request) = self.machine.on_inputs(prefs, coords) {
            info!(query = %request.query, generation = request.generation, "fetching forecast");

            let client = Arc::clone(&self.client);
            let results = results.clone();
            tokio::spawn(async move {
                let result = client.fetch(&request.query).await;
                // Receiver is gone after teardown; the result is moot then.
                let _ = results.send((request.generation, result));
            });
        }
        self.publish(prefs);
    }

    fn publish(&self, prefs: &Preferences) {
        self.snapshot.send_replace(Snapshot {
            state: self.machine.state().clone(),
            preferences: prefs.clone(),
            advisory: self.advisory,
        });
    }

    fn finish(&mut self, prefs: Preferences) {
        self.location.stop_updates();
        self.machine.shut_down();
        self.publish(&prefs);
        info!("forecast controller stopped");
    }
}
