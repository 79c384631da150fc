use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Default downscale ratio between detection passes.
pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;
/// Default false-positive suppression threshold.
pub const DEFAULT_MIN_NEIGHBORS: u32 = 5;
/// Default minimum detection size in pixels (square).
pub const DEFAULT_MIN_SIZE: u32 = 30;

/// Numeric parameters for a detector backend.
///
/// The three tuning knobs mirror a staged cascade classifier: how aggressively
/// the image pyramid is downscaled between passes, how many neighboring
/// sub-window hits a detection needs to survive, and the smallest rectangle
/// worth reporting. Backends that do not use a pretrained artifact ignore
/// `model_path`.
#[derive(Clone, Debug)]
pub struct DetectorConfig {
    /// Pretrained classifier artifact (e.g. a cascade XML file).
    pub model_path: Option<PathBuf>,
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub min_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: DEFAULT_MIN_SIZE,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scale_factor <= 1.0 {
            return Err(anyhow!(
                "detector scale_factor must be greater than 1.0, got {}",
                self.scale_factor
            ));
        }
        if self.min_neighbors == 0 {
            return Err(anyhow!("detector min_neighbors must be at least 1"));
        }
        if self.min_size == 0 {
            return Err(anyhow!("detector min_size must be at least 1 pixel"));
        }
        Ok(())
    }
}

/// Detector backend trait.
///
/// The concrete detection algorithm (cascade classifier, learned model, test
/// stub) is swappable behind this trait without touching the pipeline's
/// control flow. Implementations must treat the frame as read-only and
/// ephemeral: detections are only valid for the frame that produced them.
///
/// Returning zero detections and "nothing there" are the same thing; the
/// pipeline does not treat an empty result as a fault.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame. Zero-or-more rectangles, duplicates allowed.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_detector_defaults() {
        let config = DetectorConfig::default();
        assert_eq!(config.scale_factor, 1.1);
        assert_eq!(config.min_neighbors, 5);
        assert_eq!(config.min_size, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_degenerate_parameters() {
        let mut config = DetectorConfig {
            scale_factor: 1.0,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());

        config.scale_factor = 1.1;
        config.min_neighbors = 0;
        assert!(config.validate().is_err());

        config.min_neighbors = 5;
        config.min_size = 0;
        assert!(config.validate().is_err());
    }
}
