//! Scoring coefficients.
//!
//! `AlgorithmWeights` is an immutable value handed to each calculation. A
//! caller experimenting with weights keeps its own draft and derives new
//! values with `with_override`; results already computed never change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snowday_core::{ConfigError, KNOWN_WEIGHT_NAMES};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmWeights {
    pub snowfall_multiplier: f64,
    pub snowfall_max: f64,
    pub temp_below_zero: f64,
    pub temp_below_two: f64,
    pub temp_below_five: f64,
    pub temp_above_five_penalty: f64,
    pub precip_multiplier: f64,
    pub wind_above_25: f64,
    pub wind_above_40: f64,
    pub public_school_bonus: f64,
    pub university_penalty: f64,
    pub district_cautious_bonus: f64,
    pub district_resistant_penalty: f64,
}

impl Default for AlgorithmWeights {
    fn default() -> Self {
        Self {
            snowfall_multiplier: 8.0,
            snowfall_max: 50.0,
            temp_below_zero: 15.0,
            temp_below_two: 10.0,
            temp_below_five: 5.0,
            temp_above_five_penalty: -10.0,
            precip_multiplier: 0.2,
            wind_above_25: 5.0,
            wind_above_40: 10.0,
            public_school_bonus: 5.0,
            university_penalty: -10.0,
            district_cautious_bonus: 10.0,
            district_resistant_penalty: -10.0,
        }
    }
}

impl AlgorithmWeights {
    /// Look up a weight by its config name.
    pub fn get(&self, name: &str) -> Option<f64> {
        let mut copy = *self;
        copy.slot_mut(name).map(|v| *v)
    }

    /// Copy of these weights with one coefficient replaced.
    ///
    /// # Errors
    /// `UnknownWeight` for an unrecognized name, `Invalid` for NaN or infinity.
    pub fn with_override(&self, name: &str, value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "weight '{}' must be finite, got {}",
                name, value
            )));
        }
        let mut next = *self;
        let slot = next
            .slot_mut(name)
            .ok_or_else(|| ConfigError::UnknownWeight(name.to_string()))?;
        *slot = value;
        Ok(next)
    }

    /// Apply every override in `overrides`, stopping at the first bad one.
    ///
    /// # Errors
    /// See [`AlgorithmWeights::with_override`].
    pub fn with_overrides(&self, overrides: &BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        overrides
            .iter()
            .try_fold(*self, |acc, (name, value)| acc.with_override(name, *value))
    }

    /// All coefficients with their config names, in declaration order.
    pub fn named_values(&self) -> Vec<(&'static str, f64)> {
        KNOWN_WEIGHT_NAMES
            .iter()
            .filter_map(|name| self.get(name).map(|v| (*name, v)))
            .collect()
    }

    pub fn is_finite(&self) -> bool {
        self.named_values().iter().all(|(_, v)| v.is_finite())
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut f64> {
        let slot = match name {
            "snowfall_multiplier" => &mut self.snowfall_multiplier,
            "snowfall_max" => &mut self.snowfall_max,
            "temp_below_zero" => &mut self.temp_below_zero,
            "temp_below_two" => &mut self.temp_below_two,
            "temp_below_five" => &mut self.temp_below_five,
            "temp_above_five_penalty" => &mut self.temp_above_five_penalty,
            "precip_multiplier" => &mut self.precip_multiplier,
            "wind_above_25" => &mut self.wind_above_25,
            "wind_above_40" => &mut self.wind_above_40,
            "public_school_bonus" => &mut self.public_school_bonus,
            "university_penalty" => &mut self.university_penalty,
            "district_cautious_bonus" => &mut self.district_cautious_bonus,
            "district_resistant_penalty" => &mut self.district_resistant_penalty,
            _ => return None,
        };
        Some(slot)
    }
}
