use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Tunables of the bubble scan. Any field left out of a JSON file keeps its default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionOptions {
    /// Distance in pixels between candidate centers.
    pub scan_step: u32,
    /// Expected bubble radius in pixels; also the margin kept from the image border.
    pub bubble_radius: u32,
    /// Average darkness a candidate must exceed to count as marked.
    pub min_darkness: f64,
    /// Fraction of dark samples a candidate must exceed.
    pub dark_ratio_threshold: f64,
    /// The winning candidate of a question must exceed `min_darkness * strict_multiplier`.
    pub strict_multiplier: f64,
    /// Fewer resolved answers than this fraction of the questions raises a warning.
    pub low_detection_warning_fraction: f64,
    /// Shard the scan rows across the rayon pool.
    pub parallel: bool,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        DetectionOptions {
            scan_step: 10,
            bubble_radius: 15,
            min_darkness: 80.0,
            dark_ratio_threshold: 0.4,
            strict_multiplier: 1.2,
            low_detection_warning_fraction: 0.1,
            parallel: true,
        }
    }
}

impl DetectionOptions {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let options: DetectionOptions = serde_json::from_str(&contents)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_step == 0 {
            return Err(ConfigError::Invalid("scanStep must be at least 1"));
        }
        if self.bubble_radius == 0 {
            return Err(ConfigError::Invalid("bubbleRadius must be at least 1"));
        }
        let thresholds = [
            self.min_darkness,
            self.dark_ratio_threshold,
            self.strict_multiplier,
            self.low_detection_warning_fraction,
        ];
        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(ConfigError::Invalid("thresholds must be finite numbers"));
        }
        Ok(())
    }

    /// Darkness the winner of a question has to beat.
    pub fn strict_darkness(&self) -> f64 {
        self.min_darkness * self.strict_multiplier
    }
}
