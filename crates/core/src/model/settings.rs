use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("tick period must be between 10 and 60000 ms, got {0}")]
    InvalidTickPeriod(u64),
}

/// Runtime knobs for assessment sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentSettings {
    tick_period_ms: u64,
    low_time_warning_secs: u32,
    shuffle_questions: bool,
}

/// Unvalidated settings as read from a config file; missing fields take defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssessmentSettingsDraft {
    pub tick_period_ms: Option<u64>,
    pub low_time_warning_secs: Option<u32>,
    pub shuffle_questions: Option<bool>,
}

impl AssessmentSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft, filling unset fields from [`AssessmentSettings::default`].
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidTickPeriod` outside `10..=60000` ms.
    pub fn validate(self) -> Result<AssessmentSettings, SettingsError> {
        let defaults = AssessmentSettings::default();
        let tick_period_ms = self.tick_period_ms.unwrap_or(defaults.tick_period_ms);
        if !(10..=60_000).contains(&tick_period_ms) {
            return Err(SettingsError::InvalidTickPeriod(tick_period_ms));
        }

        Ok(AssessmentSettings {
            tick_period_ms,
            low_time_warning_secs: self
                .low_time_warning_secs
                .unwrap_or(defaults.low_time_warning_secs),
            shuffle_questions: self.shuffle_questions.unwrap_or(defaults.shuffle_questions),
        })
    }
}

impl AssessmentSettings {
    /// One countdown unit: the wall-clock period between ticks.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Remaining seconds at or below which the countdown is shown as low.
    #[must_use]
    pub fn low_time_warning_secs(&self) -> u32 {
        self.low_time_warning_secs
    }

    #[must_use]
    pub fn shuffle_questions(&self) -> bool {
        self.shuffle_questions
    }
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self {
            tick_period_ms: 1_000,
            low_time_warning_secs: 60,
            shuffle_questions: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_uses_defaults() {
        let settings = AssessmentSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, AssessmentSettings::default());
        assert_eq!(settings.tick_period(), Duration::from_secs(1));
    }

    #[test]
    fn rejects_tick_period_out_of_range() {
        let draft = AssessmentSettingsDraft {
            tick_period_ms: Some(5),
            ..AssessmentSettingsDraft::default()
        };
        assert_eq!(draft.validate(), Err(SettingsError::InvalidTickPeriod(5)));
    }

    #[test]
    fn deserializes_partial_draft() {
        let draft: AssessmentSettingsDraft =
            serde_json::from_str(r#"{"low_time_warning_secs": 30}"#).unwrap();
        let settings = draft.validate().unwrap();
        assert_eq!(settings.low_time_warning_secs(), 30);
        assert!(!settings.shuffle_questions());
    }
}
