use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snowday_core::ConfigError;

/// Kind of school the prediction is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchoolType {
    #[default]
    Public,
    Private,
    University,
}

impl SchoolType {
    /// Stable fragment used in cache keys and config files
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::University => "university",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Public => "Public school",
            Self::Private => "Private school",
            Self::University => "University",
        }
    }
}

impl FromStr for SchoolType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "university" | "college" => Ok(Self::University),
            other => Err(ConfigError::Invalid(format!("unknown school type '{}'", other))),
        }
    }
}

impl fmt::Display for SchoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// How readily the district has historically closed for weather
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CautionLevel {
    #[default]
    Standard,
    Cautious,
    Resistant,
}

impl CautionLevel {
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Cautious => "cautious",
            Self::Resistant => "resistant",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Standard => "Closes like most districts",
            Self::Cautious => "Closes early and often",
            Self::Resistant => "Rarely closes",
        }
    }
}

impl FromStr for CautionLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "cautious" => Ok(Self::Cautious),
            "resistant" => Ok(Self::Resistant),
            other => Err(ConfigError::Invalid(format!("unknown caution level '{}'", other))),
        }
    }
}

impl fmt::Display for CautionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}
