//! Snow-day closure probability engine.
//!
//! Scores weather samples with an additive, auditable weighting, projects the
//! score over the next 24 hours, and sequences the forecast lookup with its
//! cache, deadline and manual fallback. Also keeps the community vote tally.

pub mod manual;
pub mod orchestrator;
pub mod outlook;
pub mod scoring;
pub mod state;
pub mod trend;
pub mod types;
pub mod votes;
pub mod weights;

pub use manual::{ManualSampleInput, ParsedManualSample};
pub use orchestrator::{
    CalculateRequest, ForecastSource, Orchestrator, Prediction, RequestMode,
};
pub use outlook::ClosureOutlook;
pub use scoring::{score, FactorContributions, ScoreResult};
pub use state::{CalcState, Failure};
pub use trend::{project, TrendProjection, HEADLINE_WINDOW_HOURS};
pub use types::{CautionLevel, SchoolType};
pub use votes::{CommunityVote, VoteChoice, VoteOutcome, VoteStatus, VoteStore};
pub use weights::AlgorithmWeights;
