//! Additive closure scoring.
//!
//! Six independent terms are summed into a raw score, which is clamped to
//! `[0, 100]` and rounded. The terms themselves are reported unclamped so the
//! breakdown always explains the raw sum, even when it exceeds the reported
//! probability.

use serde::{Deserialize, Serialize};
use snowday_weather::WeatherSample;

use crate::types::{CautionLevel, SchoolType};
use crate::weights::AlgorithmWeights;

/// Per-factor partial scores. They sum to the raw (pre-clamp) score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct FactorContributions {
    pub snowfall: f64,
    pub temperature: f64,
    pub precipitation: f64,
    pub wind: f64,
    pub school_type: f64,
    pub district_caution: f64,
}

impl FactorContributions {
    pub fn total(&self) -> f64 {
        self.snowfall
            + self.temperature
            + self.precipitation
            + self.wind
            + self.school_type
            + self.district_caution
    }

    /// Label/value pairs in display order.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("Snowfall", self.snowfall),
            ("Temperature", self.temperature),
            ("Precipitation", self.precipitation),
            ("Wind", self.wind),
            ("School type", self.school_type),
            ("District caution", self.district_caution),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Clamped, rounded closure probability in percent
    pub probability: u8,
    pub contributions: FactorContributions,
}

/// Score one weather sample. Pure and deterministic.
pub fn score(
    sample: &WeatherSample,
    school_type: SchoolType,
    caution: CautionLevel,
    weights: &AlgorithmWeights,
) -> ScoreResult {
    let contributions = FactorContributions {
        snowfall: snowfall_term(sample.snowfall_cm, weights),
        temperature: temperature_term(sample.temperature_c, weights),
        precipitation: sample.precipitation_probability_pct * weights.precip_multiplier,
        wind: wind_term(sample.wind_speed_kmh, weights),
        school_type: school_type_term(school_type, weights),
        district_caution: caution_term(caution, weights),
    };

    ScoreResult {
        probability: to_probability(contributions.total()),
        contributions,
    }
}

fn snowfall_term(snowfall_cm: f64, weights: &AlgorithmWeights) -> f64 {
    (snowfall_cm * weights.snowfall_multiplier).min(weights.snowfall_max)
}

fn temperature_term(temperature_c: f64, weights: &AlgorithmWeights) -> f64 {
    if temperature_c < 0.0 {
        weights.temp_below_zero
    } else if temperature_c < 2.0 {
        weights.temp_below_two
    } else if temperature_c < 5.0 {
        weights.temp_below_five
    } else {
        weights.temp_above_five_penalty
    }
}

fn wind_term(wind_speed_kmh: f64, weights: &AlgorithmWeights) -> f64 {
    let mut term = 0.0;
    if wind_speed_kmh > 25.0 {
        term += weights.wind_above_25;
    }
    if wind_speed_kmh > 40.0 {
        term += weights.wind_above_40;
    }
    term
}

fn school_type_term(school_type: SchoolType, weights: &AlgorithmWeights) -> f64 {
    match school_type {
        SchoolType::Public => weights.public_school_bonus,
        SchoolType::Private => 0.0,
        SchoolType::University => weights.university_penalty,
    }
}

fn caution_term(caution: CautionLevel, weights: &AlgorithmWeights) -> f64 {
    match caution {
        CautionLevel::Standard => 0.0,
        CautionLevel::Cautious => weights.district_cautious_bonus,
        CautionLevel::Resistant => weights.district_resistant_penalty,
    }
}

fn to_probability(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}
