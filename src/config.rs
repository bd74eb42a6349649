use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Detection thresholds for the whole pipeline, loaded from TOML.
/// Every field has a default, so the config file is optional.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TrackerConfig {
    pub position: PositionConfig,
    pub movement: MovementConfig,
    pub completion: CompletionConfig,
    pub scoring: ScoringConfig,
    pub advice: AdviceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// No hole is reported when every qualifying anchor is farther than this.
    pub max_detection_radius_m: f64,
    /// A pin only competes for hole detection inside this radius.
    pub pin_detection_radius_m: f64,
    pub tee_radius_m: f64,
    pub green_radius_m: f64,
    /// Anything closer to the pin than this is classified as green.
    pub green_approach_m: f64,
    /// Distance from any tee or pin still considered on the course.
    pub boundary_buffer_m: f64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            max_detection_radius_m: 500.0,
            pin_detection_radius_m: 100.0,
            tee_radius_m: 20.0,
            green_radius_m: 25.0,
            green_approach_m: 50.0,
            boundary_buffer_m: 600.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub min_shot_distance_m: f64,
    pub max_shot_window_secs: f64,
    pub walking_speed_ceiling_mps: f64,
    /// Only the predecessor inside this trailing window is compared.
    pub analysis_window_secs: i64,
    /// Samples older than this age out of the window.
    pub retention_secs: i64,
    /// Transitions faster than this are penalised as GPS jitter.
    pub jitter_window_secs: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            min_shot_distance_m: 20.0,
            max_shot_window_secs: 30.0,
            walking_speed_ceiling_mps: 2.0,
            analysis_window_secs: 5 * 60,
            retention_secs: 2 * 60 * 60,
            jitter_window_secs: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub completion_threshold_m: f64,
    pub green_threshold_m: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            completion_threshold_m: 5.0,
            green_threshold_m: 20.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub max_reasonable_score: u32,
    pub high_confidence: f64,
    pub medium_confidence: f64,
    pub max_par_deviation: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_reasonable_score: 12,
            high_confidence: 0.8,
            medium_confidence: 0.6,
            max_par_deviation: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdviceConfig {
    /// Advice service root. Without it commentary comes from the phrase table.
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 3000,
        }
    }
}

impl TrackerConfig {
    /// Load thresholds from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            log::debug!("[CONFIG] No config file given, using defaults");
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("[CONFIG] Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = TrackerConfig::from_toml("").unwrap();
        assert_eq!(config.position.max_detection_radius_m, 500.0);
        assert_eq!(config.movement.retention_secs, 7200);
        assert_eq!(config.scoring.max_reasonable_score, 12);
        assert!(config.advice.base_url.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = TrackerConfig::from_toml(
            r#"
            [movement]
            min_shot_distance_m = 30.0

            [advice]
            base_url = "http://localhost:8080"
            "#,
        )
        .unwrap();
        assert_eq!(config.movement.min_shot_distance_m, 30.0);
        assert_eq!(config.movement.max_shot_window_secs, 30.0);
        assert_eq!(config.advice.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.advice.timeout_ms, 3000);
    }

    #[test]
    fn missing_path_is_default_but_unreadable_path_is_error() {
        assert!(TrackerConfig::load(None).is_ok());
        let err = TrackerConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(err, Err(ConfigError::Read { .. })));
    }
}
