use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::StatsError;

/// Thresholds used by the rivalry classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RivalryThresholds {
    /// Absolute win margin that makes an opponent a victim (or nemesis).
    pub dominance_margin: u32,
    /// Share of decided games that makes an opponent a victim (or nemesis).
    pub dominance_ratio: f64,
    /// Minimum win margin required before the ratio rule applies.
    pub ratio_min_margin: u32,
    pub rival_max_margin: u32,
    pub rival_min_matchups: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordOptions {
    /// Games a member needs before holding a career win-percentage record.
    pub min_career_games_for_percentage: u32,
}

/// Versioned engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsRuleset {
    pub ruleset_version: u32,
    pub rivalry: RivalryThresholds,
    pub records: RecordOptions,
}

impl Default for StatsRuleset {
    fn default() -> Self {
        Self::v1()
    }
}

impl StatsRuleset {
    #[must_use]
    pub fn v1() -> Self {
        Self {
            ruleset_version: 1,
            rivalry: RivalryThresholds {
                dominance_margin: 5,
                dominance_ratio: 0.70,
                ratio_min_margin: 2,
                rival_max_margin: 1,
                rival_min_matchups: 5,
            },
            records: RecordOptions {
                min_career_games_for_percentage: 10,
            },
        }
    }

    /// Validates threshold bounds.
    ///
    /// # Errors
    /// Returns [`StatsError::Configuration`] when a field is outside its
    /// allowed range.
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.ruleset_version == 0 {
            return Err(StatsError::Configuration(
                "ruleset_version MUST be >= 1".to_string(),
            ));
        }

        let rivalry = &self.rivalry;
        if !(rivalry.dominance_ratio > 0.5 && rivalry.dominance_ratio <= 1.0) {
            return Err(StatsError::Configuration(
                "rivalry.dominance_ratio MUST be in (0.5, 1.0]".to_string(),
            ));
        }

        if rivalry.dominance_margin == 0 {
            return Err(StatsError::Configuration(
                "rivalry.dominance_margin MUST be >= 1".to_string(),
            ));
        }

        if rivalry.rival_max_margin >= rivalry.ratio_min_margin {
            return Err(StatsError::Configuration(
                "rivalry.rival_max_margin MUST be below rivalry.ratio_min_margin".to_string(),
            ));
        }

        if rivalry.ratio_min_margin > rivalry.dominance_margin {
            return Err(StatsError::Configuration(
                "rivalry.ratio_min_margin cannot exceed rivalry.dominance_margin".to_string(),
            ));
        }

        Ok(())
    }

    /// Decodes and validates a ruleset from JSON.
    ///
    /// # Errors
    /// Returns [`StatsError::Configuration`] when decoding fails or the
    /// decoded values are out of range.
    pub fn from_json(value: &Value) -> Result<Self, StatsError> {
        let ruleset: Self = serde_json::from_value(value.clone()).map_err(|err| {
            StatsError::Configuration(format!("invalid ruleset JSON payload: {err}"))
        })?;
        ruleset.validate()?;
        Ok(ruleset)
    }
}
