//! Model and temperature configuration of a chat.

use serde::Serialize;

use crate::error::ChatError;
use crate::llm::ModelId;

/// Temperature used when nothing else is configured.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Per-chat generation settings.
///
/// The temperature always lies in `[0, model.max_temperature()]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChatSettings {
    model: ModelId,
    temperature: f64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl ChatSettings {
    /// Build settings, clamping `temperature` into the model's range.
    ///
    /// A non-finite temperature falls back to [`DEFAULT_TEMPERATURE`].
    #[must_use]
    pub fn new(model: ModelId, temperature: f64) -> Self {
        let temperature = model
            .clamp_temperature(temperature)
            .or_else(|| model.clamp_temperature(DEFAULT_TEMPERATURE))
            .unwrap_or(0.0);
        Self { model, temperature }
    }

    /// Selected model.
    #[must_use]
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Stored temperature.
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Maximum temperature of the selected model.
    #[must_use]
    pub fn max_temperature(&self) -> f64 {
        self.model.max_temperature()
    }

    /// Store `value` clamped to `[0, max]` and return what was stored.
    pub fn set_temperature(&mut self, value: f64) -> Result<f64, ChatError> {
        let clamped = self
            .model
            .clamp_temperature(value)
            .ok_or(ChatError::InvalidTemperature(value))?;
        self.temperature = clamped;
        Ok(clamped)
    }

    /// Switch model. The current temperature is re-clamped to the new
    /// model's range.
    pub fn set_model(&mut self, model: ModelId) {
        self.model = model;
        self.temperature = self.temperature.min(model.max_temperature());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_defaults() {
        let s = ChatSettings::default();
        assert_eq!(s.model(), ModelId::Gemini15Pro);
        assert!(approx(s.temperature(), 0.7));
        assert!(approx(s.max_temperature(), 2.0));
    }

    #[test]
    fn test_clamp_above_pro_max() {
        let mut s = ChatSettings::default();
        assert!(approx(s.set_temperature(3.0).unwrap(), 2.0));
        assert!(approx(s.temperature(), 2.0));
    }

    #[test]
    fn test_clamp_above_flash_max() {
        let mut s = ChatSettings::new(ModelId::Gemini15Flash, 0.2);
        assert!(approx(s.set_temperature(1.7).unwrap(), 1.0));
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        let mut s = ChatSettings::default();
        assert!(approx(s.set_temperature(-1.0).unwrap(), 0.0));
    }

    #[test]
    fn test_in_range_kept() {
        let mut s = ChatSettings::default();
        assert!(approx(s.set_temperature(1.3).unwrap(), 1.3));
    }

    #[test]
    fn test_non_finite_rejected_and_unchanged() {
        let mut s = ChatSettings::default();
        s.set_temperature(1.1).unwrap();
        assert!(s.set_temperature(f64::NAN).is_err());
        assert!(matches!(
            s.set_temperature(f64::NEG_INFINITY),
            Err(ChatError::InvalidTemperature(_))
        ));
        assert!(approx(s.temperature(), 1.1));
    }

    #[test]
    fn test_model_switch_reclamps() {
        let mut s = ChatSettings::default();
        s.set_temperature(1.8).unwrap();
        s.set_model(ModelId::Gemini15Flash);
        assert!(approx(s.temperature(), 1.0));

        // Switching back does not restore the old value.
        s.set_model(ModelId::Gemini15Pro);
        assert!(approx(s.temperature(), 1.0));
    }

    #[test]
    fn test_model_switch_keeps_lower_value() {
        let mut s = ChatSettings::default();
        s.set_temperature(0.4).unwrap();
        s.set_model(ModelId::Gemini15Flash);
        assert!(approx(s.temperature(), 0.4));
    }

    #[test]
    fn test_new_clamps_and_falls_back() {
        assert!(approx(
            ChatSettings::new(ModelId::Gemini15Flash, 5.0).temperature(),
            1.0
        ));
        assert!(approx(
            ChatSettings::new(ModelId::Gemini15Pro, f64::NAN).temperature(),
            0.7
        ));
    }

    #[test]
    fn test_property_stored_is_min_of_input_and_max() {
        for model in ModelId::ALL {
            for step in 0..=40 {
                let t = f64::from(step) * 0.1;
                let mut s = ChatSettings::new(model, 0.0);
                let stored = s.set_temperature(t).unwrap();
                assert!(approx(stored, t.min(model.max_temperature())));
                assert!(stored >= 0.0);
            }
        }
    }
}
