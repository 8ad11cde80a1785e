use std::time::Duration;

use serde::{Deserialize, Serialize};

// ==================== Defaults ====================

/// Weight added to a pair each time it is marked for repetition
pub const DEFAULT_REPEAT_BOOST: u32 = 4;

/// Weight ceiling, five times the baseline weight of 1
pub const DEFAULT_MAX_WEIGHT: u32 = 5;

/// One correct answer plus three distractors
pub const DEFAULT_QUIZ_OPTION_COUNT: usize = 4;

pub const DEFAULT_QUIZ_REVEAL_DELAY_MS: u64 = 1000;

pub const DEFAULT_WRITE_ADVANCE_DELAY_MS: u64 = 1000;

/// Tunables shared by the three session engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub repeat_boost: u32,
    pub max_weight: u32,
    pub quiz_option_count: usize,
    pub quiz_reveal_delay_ms: u64,
    pub write_advance_delay_ms: u64,
    /// Fixed RNG seed, `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            repeat_boost: DEFAULT_REPEAT_BOOST,
            max_weight: DEFAULT_MAX_WEIGHT,
            quiz_option_count: DEFAULT_QUIZ_OPTION_COUNT,
            quiz_reveal_delay_ms: DEFAULT_QUIZ_REVEAL_DELAY_MS,
            write_advance_delay_ms: DEFAULT_WRITE_ADVANCE_DELAY_MS,
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            repeat_boost: env_parse("DECKCYCLE_REPEAT_BOOST").unwrap_or(defaults.repeat_boost),
            max_weight: env_parse("DECKCYCLE_MAX_WEIGHT").unwrap_or(defaults.max_weight),
            quiz_option_count: env_parse("DECKCYCLE_QUIZ_OPTIONS")
                .unwrap_or(defaults.quiz_option_count),
            quiz_reveal_delay_ms: env_parse("DECKCYCLE_QUIZ_REVEAL_DELAY_MS")
                .unwrap_or(defaults.quiz_reveal_delay_ms),
            write_advance_delay_ms: env_parse("DECKCYCLE_WRITE_ADVANCE_DELAY_MS")
                .unwrap_or(defaults.write_advance_delay_ms),
            seed: env_parse("DECKCYCLE_SEED"),
        }
        .normalized()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Clamp values into ranges the engines rely on
    pub fn normalized(mut self) -> Self {
        self.max_weight = self.max_weight.max(1);
        self.quiz_option_count = self.quiz_option_count.max(1);
        self
    }

    pub fn quiz_reveal_delay(&self) -> Duration {
        Duration::from_millis(self.quiz_reveal_delay_ms)
    }

    pub fn write_advance_delay(&self) -> Duration {
        Duration::from_millis(self.write_advance_delay_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_floors() {
        let config = SessionConfig {
            max_weight: 0,
            quiz_option_count: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.max_weight, 1);
        assert_eq!(config.quiz_option_count, 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"maxWeight": 3}"#).unwrap();
        assert_eq!(config.max_weight, 3);
        assert_eq!(config.repeat_boost, DEFAULT_REPEAT_BOOST);
        assert_eq!(config.write_advance_delay(), Duration::from_millis(1000));
    }
}
