//! Supported Gemini models and their sampling limits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ChatError;

/// Identifier of a supported generative model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModelId {
    /// `gemini-1.5-pro`
    #[default]
    Gemini15Pro,
    /// `gemini-1.5-flash`
    Gemini15Flash,
}

impl ModelId {
    /// Every supported model, in the order the selector lists them.
    pub const ALL: [Self; 2] = [Self::Gemini15Pro, Self::Gemini15Flash];

    /// Wire identifier used in API paths and form values.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini15Pro => "gemini-1.5-pro",
            Self::Gemini15Flash => "gemini-1.5-flash",
        }
    }

    /// Human-readable label for the selector.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Gemini15Pro => "Gemini 1.5 Pro",
            Self::Gemini15Flash => "Gemini 1.5 Flash",
        }
    }

    /// Upper bound of the temperature range accepted by this model.
    #[must_use]
    pub fn max_temperature(self) -> f64 {
        match self {
            Self::Gemini15Pro => 2.0,
            Self::Gemini15Flash => 1.0,
        }
    }

    /// Clamp `value` into `[0, max_temperature]`.
    ///
    /// Returns `None` for NaN or infinite input.
    #[must_use]
    pub fn clamp_temperature(self, value: f64) -> Option<f64> {
        value
            .is_finite()
            .then(|| value.clamp(0.0, self.max_temperature()))
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == trimmed)
            .ok_or_else(|| ChatError::UnknownModel(trimmed.to_string()))
    }
}

impl Serialize for ModelId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModelId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
