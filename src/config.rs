use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::DetectorConfig;
use crate::source::{SourceConfig, SourceSpec};

const DEFAULT_SOURCE: &str = "stub://traffic";
const DEFAULT_FPS: u32 = 10;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_BACKEND: &str = "stub";

#[derive(Debug, Deserialize, Default)]
struct RoadwatchConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    output: Option<OutputConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    identifier: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    scale_factor: Option<f64>,
    min_neighbors: Option<u32>,
    min_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    enabled: Option<bool>,
}

/// Daemon configuration: JSON file named by `ROADWATCH_CONFIG`, overridden
/// by individual `ROADWATCH_*` environment variables, validated after both.
#[derive(Debug, Clone)]
pub struct RoadwatchConfig {
    pub source: SourceConfig,
    /// Detector backend name ("stub", "scripted", "cascade").
    pub detector_backend: String,
    pub detector: DetectorConfig,
    /// Optional frame sink path. Absent means no output artifact.
    pub output_path: Option<PathBuf>,
    pub display_enabled: bool,
}

impl RoadwatchConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ROADWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RoadwatchConfigFile) -> Self {
        let source = SourceConfig {
            identifier: file
                .source
                .as_ref()
                .and_then(|source| source.identifier.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            target_fps: file
                .source
                .as_ref()
                .and_then(|source| source.target_fps)
                .unwrap_or(DEFAULT_FPS),
            width: file
                .source
                .as_ref()
                .and_then(|source| source.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .source
                .as_ref()
                .and_then(|source| source.height)
                .unwrap_or(DEFAULT_HEIGHT),
        };
        let defaults = DetectorConfig::default();
        let detector = DetectorConfig {
            model_path: file.detector.as_ref().and_then(|d| d.model_path.clone()),
            scale_factor: file
                .detector
                .as_ref()
                .and_then(|d| d.scale_factor)
                .unwrap_or(defaults.scale_factor),
            min_neighbors: file
                .detector
                .as_ref()
                .and_then(|d| d.min_neighbors)
                .unwrap_or(defaults.min_neighbors),
            min_size: file
                .detector
                .as_ref()
                .and_then(|d| d.min_size)
                .unwrap_or(defaults.min_size),
        };
        let detector_backend = file
            .detector
            .and_then(|d| d.backend)
            .unwrap_or_else(|| DEFAULT_BACKEND.to_string());
        let output_path = file.output.and_then(|output| output.path);
        let display_enabled = file
            .display
            .and_then(|display| display.enabled)
            .unwrap_or(true);
        Self {
            source,
            detector_backend,
            detector,
            output_path,
            display_enabled,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(identifier) = std::env::var("ROADWATCH_SOURCE") {
            if !identifier.trim().is_empty() {
                self.source.identifier = identifier;
            }
        }
        if let Ok(fps) = std::env::var("ROADWATCH_FPS") {
            let fps: u32 = fps
                .parse()
                .map_err(|_| anyhow!("ROADWATCH_FPS must be an integer"))?;
            self.source.target_fps = fps;
        }
        if let Ok(backend) = std::env::var("ROADWATCH_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector_backend = backend;
            }
        }
        if let Ok(model) = std::env::var("ROADWATCH_MODEL") {
            if !model.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(model));
            }
        }
        if let Ok(output) = std::env::var("ROADWATCH_OUTPUT") {
            if !output.trim().is_empty() {
                self.output_path = Some(PathBuf::from(output));
            }
        }
        if let Ok(headless) = std::env::var("ROADWATCH_HEADLESS") {
            match headless.trim() {
                "1" | "true" | "yes" => self.display_enabled = false,
                "0" | "false" | "no" | "" => {}
                other => {
                    return Err(anyhow!(
                        "ROADWATCH_HEADLESS must be a boolean, got '{}'",
                        other
                    ))
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        SourceSpec::parse(&self.source.identifier)?;
        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be greater than zero"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be greater than zero"));
        }
        if self.detector_backend.trim().is_empty() {
            return Err(anyhow!("detector backend name must not be empty"));
        }
        self.detector.validate()?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<RoadwatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
