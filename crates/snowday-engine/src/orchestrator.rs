//! Sequences one closure-probability calculation.
//!
//! Automatic requests try the forecast cache first, then geocode and fetch
//! under a single deadline. Manual requests replicate their sample across the
//! day and never touch the cache or the network. Any failure after validation
//! leaves the session in `Failed` with manual entry suggested.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use snowday_core::PredictionError;
use snowday_weather::{
    cache_key, replicate, CacheEntry, Coordinates, ForecastCache, ForecastClient, Geocoder,
    HourlySamples, WeatherError, WeatherSample, DEFAULT_FETCH_TIMEOUT, HOURS_PER_DAY,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::outlook::ClosureOutlook;
use crate::scoring::{score, FactorContributions};
use crate::state::CalcState;
use crate::trend::project;
use crate::types::{CautionLevel, SchoolType};
use crate::weights::AlgorithmWeights;

/// Where the weather for a calculation comes from
#[derive(Debug, Clone, PartialEq)]
pub enum RequestMode {
    /// Postal code to geocode and forecast
    AutomaticForecast(String),
    /// One sample entered by hand, applied to every hour
    ManualOverride(WeatherSample),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculateRequest {
    pub mode: RequestMode,
    pub school_type: SchoolType,
    pub caution: CautionLevel,
    pub weights: AlgorithmWeights,
}

impl CalculateRequest {
    pub fn automatic(
        location: impl Into<String>,
        school_type: SchoolType,
        caution: CautionLevel,
    ) -> Self {
        Self {
            mode: RequestMode::AutomaticForecast(location.into()),
            school_type,
            caution,
            weights: AlgorithmWeights::default(),
        }
    }

    pub fn manual(sample: WeatherSample, school_type: SchoolType, caution: CautionLevel) -> Self {
        Self {
            mode: RequestMode::ManualOverride(sample),
            school_type,
            caution,
            weights: AlgorithmWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: AlgorithmWeights) -> Self {
        self.weights = weights;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastSource {
    Live,
    Cache,
    Manual,
}

/// Result of a successful calculation.
///
/// `headline` is the riskiest hour of the morning window. `contributions` and
/// `breakdown_probability` score the window's averaged weather and may be
/// lower than the headline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub hourly: [u8; HOURS_PER_DAY],
    pub headline: u8,
    pub peak_hour: usize,
    pub contributions: FactorContributions,
    pub breakdown_probability: u8,
    pub headline_basis: WeatherSample,
    pub outlook: ClosureOutlook,
    pub forecast_label: String,
    pub source: ForecastSource,
    /// Normalized postal code; `None` for manual input
    pub location: Option<String>,
    pub school_type: SchoolType,
    pub caution: CautionLevel,
}

#[derive(Default)]
struct Session {
    state: CalcState,
    generation: u64,
    in_flight: Option<CancellationToken>,
    manual_mode: bool,
}

/// Settles the session when a `calculate` future is dropped mid-flight.
struct InFlightGuard<'a> {
    session: &'a Mutex<Session>,
    generation: u64,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut session = self.session.lock();
        if session.generation != self.generation {
            return;
        }
        if let Some(token) = session.in_flight.take() {
            token.cancel();
        }
        tracing::warn!("Calculation abandoned before it finished");
        session.state = CalcState::Failed(PredictionError::Cancelled.into());
        session.manual_mode = true;
    }
}

/// Drives calculations for one user session.
pub struct Orchestrator {
    geocoder: Arc<dyn Geocoder>,
    forecast: Arc<dyn ForecastClient>,
    cache: ForecastCache,
    timeout: Duration,
    session: Mutex<Session>,
}

impl Orchestrator {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        forecast: Arc<dyn ForecastClient>,
        cache: ForecastCache,
    ) -> Self {
        Self {
            geocoder,
            forecast,
            cache,
            timeout: DEFAULT_FETCH_TIMEOUT,
            session: Mutex::new(Session::default()),
        }
    }

    /// Deadline covering geocoding plus the forecast fetch.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> CalcState {
        self.session.lock().state.clone()
    }

    /// True once a failure has switched the session to manual entry.
    pub fn manual_mode_suggested(&self) -> bool {
        self.session.lock().manual_mode
    }

    pub fn set_manual_mode(&self, enabled: bool) {
        self.session.lock().manual_mode = enabled;
    }

    /// Voting is offered once a prediction is on screen.
    pub fn can_vote(&self) -> bool {
        self.session.lock().state.prediction().is_some()
    }

    /// Cancel anything in flight and return to `Idle`.
    pub fn reset(&self) {
        let mut session = self.session.lock();
        if let Some(token) = session.in_flight.take() {
            tracing::debug!("Cancelling in-flight calculation");
            token.cancel();
        }
        session.generation = session.generation.wrapping_add(1);
        session.state = CalcState::Idle;
        session.manual_mode = false;
    }

    /// Run one calculation to completion.
    ///
    /// # Errors
    /// `MissingInput` and `Busy` are returned without touching the session.
    /// Every other error is also recorded as `CalcState::Failed`. Dropping
    /// the future early cancels the request and records `Cancelled`.
    pub async fn calculate(
        &self,
        request: CalculateRequest,
    ) -> Result<Prediction, PredictionError> {
        if let RequestMode::AutomaticForecast(location) = &request.mode {
            if location.trim().is_empty() {
                return Err(PredictionError::MissingInput);
            }
        }

        let (generation, cancel) = self.begin()?;
        let mut guard = InFlightGuard {
            session: &self.session,
            generation,
            armed: true,
        };
        let result = self.run(&request, &cancel).await;
        guard.armed = false;
        self.finish(generation, result)
    }

    fn begin(&self) -> Result<(u64, CancellationToken), PredictionError> {
        let mut session = self.session.lock();
        if !session.state.can_start() {
            tracing::debug!("Rejecting overlapping calculation");
            return Err(PredictionError::Busy);
        }
        session.generation = session.generation.wrapping_add(1);
        let token = CancellationToken::new();
        session.in_flight = Some(token.clone());
        session.state = CalcState::Requesting;
        Ok((session.generation, token))
    }

    fn finish(
        &self,
        generation: u64,
        result: Result<Prediction, PredictionError>,
    ) -> Result<Prediction, PredictionError> {
        let mut session = self.session.lock();
        if session.generation != generation {
            tracing::debug!("Discarding stale calculation result");
            return Err(PredictionError::Cancelled);
        }
        session.in_flight = None;

        if let Err(e) = &result {
            tracing::warn!("Calculation failed: {}", e);
            if e.offers_manual_override() {
                session.manual_mode = true;
            }
        }
        session.state = CalcState::on_done(result.clone());
        result
    }

    async fn run(
        &self,
        request: &CalculateRequest,
        cancel: &CancellationToken,
    ) -> Result<Prediction, PredictionError> {
        match &request.mode {
            RequestMode::ManualOverride(sample) => Ok(build_prediction(
                &replicate(*sample),
                request,
                ForecastSource::Manual,
                "Manual weather input".to_string(),
                None,
            )),
            RequestMode::AutomaticForecast(location) => {
                let location = location.trim().to_uppercase();
                let key = cache_key(
                    &location,
                    request.school_type.as_key(),
                    request.caution.as_key(),
                );

                if let Some(entry) = self.cache.get(&key) {
                    let label = format!(
                        "Cached forecast for {}",
                        describe(&location, entry.place_name.as_deref())
                    );
                    return Ok(build_prediction(
                        &entry.samples,
                        request,
                        ForecastSource::Cache,
                        label,
                        Some(location),
                    ));
                }

                let (samples, coordinates) = self.fetch_live(&location, cancel).await?;
                let entry = CacheEntry::new(samples, coordinates.place_name.clone());
                if let Err(e) = self.cache.put(&key, &entry) {
                    let degraded = PredictionError::from(e);
                    tracing::warn!("Forecast for {} not cached: {}", location, degraded);
                }

                let label = format!(
                    "Live forecast for {}",
                    describe(&location, coordinates.place_name.as_deref())
                );
                Ok(build_prediction(
                    &samples,
                    request,
                    ForecastSource::Live,
                    label,
                    Some(location),
                ))
            }
        }
    }

    async fn fetch_live(
        &self,
        location: &str,
        cancel: &CancellationToken,
    ) -> Result<(HourlySamples, Coordinates), PredictionError> {
        let started = Instant::now();
        let deadline = self.timeout;

        let work = async {
            let coordinates = self.geocoder.resolve(location).await?;
            let remaining = deadline.saturating_sub(started.elapsed());
            let samples = self
                .forecast
                .fetch_hourly(&coordinates, remaining, cancel)
                .await?;
            Ok::<_, WeatherError>((samples, coordinates))
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PredictionError::Cancelled),
            outcome = tokio::time::timeout(deadline, work) => outcome,
        };

        match outcome {
            Ok(fetched) => {
                let (samples, coordinates) = fetched?;
                tracing::info!(
                    "Fetched forecast for {} in {} ms",
                    location,
                    started.elapsed().as_millis()
                );
                Ok((samples, coordinates))
            }
            Err(_) => {
                cancel.cancel();
                Err(PredictionError::Timeout {
                    after_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}

fn build_prediction(
    samples: &HourlySamples,
    request: &CalculateRequest,
    source: ForecastSource,
    forecast_label: String,
    location: Option<String>,
) -> Prediction {
    let projection = project(samples, request.school_type, request.caution, &request.weights);
    let breakdown = score(
        &projection.headline_basis,
        request.school_type,
        request.caution,
        &request.weights,
    );

    Prediction {
        hourly: projection.hourly,
        headline: projection.headline,
        peak_hour: projection.peak_hour,
        contributions: breakdown.contributions,
        breakdown_probability: breakdown.probability,
        headline_basis: projection.headline_basis,
        outlook: ClosureOutlook::from_probability(projection.headline),
        forecast_label,
        source,
        location,
        school_type: request.school_type,
        caution: request.caution,
    }
}

fn describe(location: &str, place_name: Option<&str>) -> String {
    match place_name {
        Some(place) => format!("{} ({})", place, location),
        None => location.to_string(),
    }
}
