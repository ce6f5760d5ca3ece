use serde::{Deserialize, Serialize};

/// Coarse reading of a closure probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureOutlook {
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl ClosureOutlook {
    pub fn from_probability(probability: u8) -> Self {
        match probability {
            0..=24 => Self::Unlikely,
            25..=49 => Self::Possible,
            50..=74 => Self::Likely,
            _ => Self::VeryLikely,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Unlikely => "School is probably on. Set your alarm.",
            Self::Possible => "There's a chance. Keep an eye on the news tonight.",
            Self::Likely => "Closure is likely. Check for announcements in the morning.",
            Self::VeryLikely => "Start planning your snow day.",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unlikely => "Unlikely",
            Self::Possible => "Possible",
            Self::Likely => "Likely",
            Self::VeryLikely => "Very likely",
        }
    }
}
