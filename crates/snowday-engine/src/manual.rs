//! Parsing of the free-text manual weather form.
//!
//! Every field is read on its own. A blank or malformed field becomes 0 and
//! is reported back, so one typo never blocks the calculation.

use snowday_weather::WeatherSample;

/// Raw text of the four manual-entry fields
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualSampleInput<'a> {
    pub snowfall_cm: &'a str,
    pub temperature_c: &'a str,
    pub precipitation_probability_pct: &'a str,
    pub wind_speed_kmh: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedManualSample {
    pub sample: WeatherSample,
    /// Names of fields that could not be read and were replaced by 0
    pub rejected_fields: Vec<&'static str>,
}

impl ParsedManualSample {
    pub fn is_clean(&self) -> bool {
        self.rejected_fields.is_empty()
    }
}

impl ManualSampleInput<'_> {
    pub fn parse(&self) -> ParsedManualSample {
        let mut rejected_fields = Vec::new();
        let mut read = |raw: &str, name: &'static str| -> f64 {
            match parse_number(raw) {
                Some(v) => v,
                None => {
                    tracing::debug!("Manual field {} unreadable: {:?}", name, raw);
                    rejected_fields.push(name);
                    0.0
                }
            }
        };

        let sample = WeatherSample {
            snowfall_cm: read(self.snowfall_cm, "snowfall_cm"),
            temperature_c: read(self.temperature_c, "temperature_c"),
            precipitation_probability_pct: read(
                self.precipitation_probability_pct,
                "precipitation_probability_pct",
            ),
            wind_speed_kmh: read(self.wind_speed_kmh, "wind_speed_kmh"),
        };

        ParsedManualSample {
            sample,
            rejected_fields,
        }
    }
}

/// Decimal number, tolerating surrounding space, a trailing `%` and a decimal comma.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_end_matches('%').trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_input() {
        let parsed = ManualSampleInput {
            snowfall_cm: "8",
            temperature_c: "-5",
            precipitation_probability_pct: "60%",
            wind_speed_kmh: " 30.5 ",
        }
        .parse();

        assert!(parsed.is_clean());
        assert_eq!(parsed.sample, WeatherSample::new(8.0, -5.0, 60.0, 30.5));
    }

    #[test]
    fn test_one_bad_field_becomes_zero() {
        let parsed = ManualSampleInput {
            snowfall_cm: "lots",
            temperature_c: "-2",
            precipitation_probability_pct: "80",
            wind_speed_kmh: "12",
        }
        .parse();

        assert_eq!(parsed.rejected_fields, vec!["snowfall_cm"]);
        assert_eq!(parsed.sample.snowfall_cm, 0.0);
        assert_eq!(parsed.sample.temperature_c, -2.0);
    }

    #[test]
    fn test_blank_and_non_finite_are_rejected() {
        let parsed = ManualSampleInput {
            snowfall_cm: "",
            temperature_c: "inf",
            precipitation_probability_pct: "NaN",
            wind_speed_kmh: "3,5",
        }
        .parse();

        assert_eq!(
            parsed.rejected_fields,
            vec!["snowfall_cm", "temperature_c", "precipitation_probability_pct"]
        );
        assert_eq!(parsed.sample.wind_speed_kmh, 3.5);
    }
}
