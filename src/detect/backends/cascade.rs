use anyhow::{anyhow, Context, Result};
use opencv::{core, objdetect, prelude::*};

use crate::detect::backend::{DetectorBackend, DetectorConfig};
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Cascade classifier backend.
///
/// Loads a pretrained cascade artifact (XML) and runs staged multi-scale
/// detection over the frame's luma plane. The classifier's raw rectangles
/// are returned as-is: no non-maximum suppression, duplicates allowed.
pub struct CascadeBackend {
    classifier: objdetect::CascadeClassifier,
    config: DetectorConfig,
}

impl CascadeBackend {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let model_path = config
            .model_path
            .as_ref()
            .ok_or_else(|| anyhow!("cascade backend requires a model_path"))?;
        let path = model_path
            .to_str()
            .ok_or_else(|| anyhow!("cascade model path is not valid UTF-8"))?;
        let classifier = objdetect::CascadeClassifier::new(path)
            .with_context(|| format!("failed to load cascade model {}", path))?;
        if classifier.empty().unwrap_or(true) {
            return Err(anyhow!("cascade model {} loaded empty", path));
        }
        Ok(Self { classifier, config })
    }
}

impl DetectorBackend for CascadeBackend {
    fn name(&self) -> &'static str {
        "cascade"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let luma = frame.luma();
        let flat = core::Mat::from_slice(&luma).context("wrap luma plane")?;
        let gray = flat
            .reshape(1, frame.height as i32)
            .context("reshape luma plane")?;

        let min = self.config.min_size as i32;
        let mut objects = core::Vector::<core::Rect>::new();
        self.classifier
            .detect_multi_scale(
                &gray,
                &mut objects,
                self.config.scale_factor,
                self.config.min_neighbors as i32,
                0,
                core::Size::new(min, min),
                core::Size::default(),
            )
            .context("cascade detect_multi_scale")?;

        let detections = objects
            .iter()
            .map(|rect| Detection {
                x: rect.x.max(0) as u32,
                y: rect.y.max(0) as u32,
                width: rect.width.max(0) as u32,
                height: rect.height.max(0) as u32,
            })
            .collect();
        Ok(detections)
    }

    fn warm_up(&mut self) -> Result<()> {
        // A first detect pass on a blank frame forces lazy classifier setup
        // before the real stream starts.
        let blank = Frame::new(vec![0u8; 64 * 64 * 3], 64, 64, 0)?;
        self.detect(&blank)?;
        Ok(())
    }
}
