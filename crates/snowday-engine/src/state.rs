//! Calculation state machine.
//!
//! `Idle -> Requesting -> {Success, Failed}`. Only one calculation runs at a
//! time; `reset` returns to `Idle` from anywhere.

use serde::Serialize;
use snowday_core::PredictionError;

use crate::orchestrator::Prediction;

/// A failed calculation, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    #[serde(serialize_with = "serialize_error")]
    pub error: PredictionError,
    pub message: &'static str,
    pub manual_override_offered: bool,
}

impl From<PredictionError> for Failure {
    fn from(error: PredictionError) -> Self {
        Self {
            message: error.user_message(),
            manual_override_offered: error.offers_manual_override(),
            error,
        }
    }
}

fn serialize_error<S: serde::Serializer>(
    error: &PredictionError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum CalcState {
    #[default]
    Idle,
    Requesting,
    Success(Box<Prediction>),
    Failed(Failure),
}

impl CalcState {
    /// True if a new calculation can be started.
    pub fn can_start(&self) -> bool {
        !self.is_requesting()
    }

    pub fn is_requesting(&self) -> bool {
        matches!(self, CalcState::Requesting)
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            CalcState::Success(prediction) => Some(prediction),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            CalcState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// State after a calculation finishes.
    pub fn on_done(result: Result<Prediction, PredictionError>) -> Self {
        match result {
            Ok(prediction) => CalcState::Success(Box::new(prediction)),
            Err(error) => CalcState::Failed(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn idle_allows_start() {
        assert!(CalcState::Idle.can_start());
    }

    #[test]
    fn requesting_blocks_start() {
        assert!(!CalcState::Requesting.can_start());
        assert!(CalcState::Requesting.is_requesting());
    }

    #[test]
    fn failed_allows_retry() {
        let state = CalcState::on_done(Err(PredictionError::Timeout { after_ms: 8000 }));
        assert!(state.can_start());
        let failure = state.failure().unwrap();
        assert!(failure.manual_override_offered);
        assert_eq!(failure.message, PredictionError::Timeout { after_ms: 8000 }.user_message());
        assert!(state.prediction().is_none());
    }

    #[test]
    fn cancelled_does_not_offer_manual() {
        let state = CalcState::on_done(Err(PredictionError::Cancelled));
        assert!(!state.failure().unwrap().manual_override_offered);
    }
}
