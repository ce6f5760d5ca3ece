//! 24-hour projection and headline selection.
//!
//! The headline is the riskiest hour in the morning window, while the
//! breakdown shown next to it is scored from the window's averaged weather.
//! The two can disagree; callers rely on both values as they are.

use serde::{Deserialize, Serialize};
use snowday_weather::{HourlySamples, WeatherSample, HOURS_PER_DAY};

use crate::scoring::score;
use crate::types::{CautionLevel, SchoolType};
use crate::weights::AlgorithmWeights;

/// Hours `[0, 12)` decide the headline: closures are called before school starts.
pub const HEADLINE_WINDOW_HOURS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendProjection {
    pub hourly: [u8; HOURS_PER_DAY],
    pub headline: u8,
    /// First hour in the window that reaches the headline
    pub peak_hour: usize,
    /// Field-wise average of the window, for the factor breakdown
    pub headline_basis: WeatherSample,
}

/// Score every hour and pick the headline.
pub fn project(
    samples: &HourlySamples,
    school_type: SchoolType,
    caution: CautionLevel,
    weights: &AlgorithmWeights,
) -> TrendProjection {
    let mut hourly = [0u8; HOURS_PER_DAY];
    for (slot, sample) in hourly.iter_mut().zip(samples.iter()) {
        *slot = score(sample, school_type, caution, weights).probability;
    }

    let (headline, peak_hour) = headline_of(&hourly);
    let headline_basis =
        WeatherSample::average(&samples[..HEADLINE_WINDOW_HOURS]).unwrap_or_default();

    TrendProjection {
        hourly,
        headline,
        peak_hour,
        headline_basis,
    }
}

/// Maximum over the headline window and the first index reaching it.
pub fn headline_of(hourly: &[u8]) -> (u8, usize) {
    hourly
        .iter()
        .take(HEADLINE_WINDOW_HOURS)
        .enumerate()
        .fold((0, 0), |(best, best_hour), (hour, &p)| {
            if p > best {
                (p, hour)
            } else {
                (best, best_hour)
            }
        })
}
