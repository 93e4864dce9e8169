//! Daemon configuration.
//!
//! Layered the usual way: defaults, then an optional JSON config file
//! (path from `DETECT_CONFIG`), then `DETECT_*` environment overrides,
//! then validation. CLI flags on `detectd` override all of these.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::DetectOptions;

const DEFAULT_SOURCE: &str = "stub://camera";
const DEFAULT_CADENCE_SECS: f64 = 1.0;

#[derive(Debug, Deserialize, Default)]
struct DaemonConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    session: Option<SessionConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    uri: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    model: Option<PathBuf>,
    confidence: Option<f32>,
    iou: Option<f32>,
    image_size: Option<u32>,
    classes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct SessionConfigFile {
    cadence_secs: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub source: String,
    /// ONNX model path; `None` selects the stub backend.
    pub model: Option<PathBuf>,
    pub options: DetectOptions,
    pub cadence: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            model: None,
            options: DetectOptions::default(),
            cadence: Duration::from_secs_f64(DEFAULT_CADENCE_SECS),
        }
    }
}

impl DaemonConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DETECT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DaemonConfigFile) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(uri) = file.source.and_then(|source| source.uri) {
            cfg.source = uri;
        }
        if let Some(detector) = file.detector {
            cfg.model = detector.model;
            if let Some(confidence) = detector.confidence {
                cfg.options.confidence = confidence;
            }
            if let Some(iou) = detector.iou {
                cfg.options.iou = iou;
            }
            if let Some(image_size) = detector.image_size {
                cfg.options.image_size = image_size;
            }
            if detector.classes.is_some() {
                cfg.options.classes = detector.classes;
            }
        }
        if let Some(cadence_secs) = file.session.and_then(|session| session.cadence_secs) {
            cfg.cadence = parse_cadence(cadence_secs)?;
        }
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(uri) = std::env::var("DETECT_SOURCE") {
            if !uri.trim().is_empty() {
                self.source = uri;
            }
        }
        if let Ok(model) = std::env::var("DETECT_MODEL") {
            if !model.trim().is_empty() {
                self.model = Some(PathBuf::from(model));
            }
        }
        if let Ok(confidence) = std::env::var("DETECT_CONFIDENCE") {
            self.options.confidence = confidence
                .parse()
                .map_err(|_| anyhow!("DETECT_CONFIDENCE must be a number"))?;
        }
        if let Ok(iou) = std::env::var("DETECT_IOU") {
            self.options.iou = iou
                .parse()
                .map_err(|_| anyhow!("DETECT_IOU must be a number"))?;
        }
        if let Ok(image_size) = std::env::var("DETECT_IMAGE_SIZE") {
            self.options.image_size = image_size
                .parse()
                .map_err(|_| anyhow!("DETECT_IMAGE_SIZE must be an integer"))?;
        }
        if let Ok(classes) = std::env::var("DETECT_CLASSES") {
            let parsed = split_csv(&classes);
            if !parsed.is_empty() {
                self.options.classes = Some(parsed);
            }
        }
        if let Ok(cadence) = std::env::var("DETECT_CADENCE_SECS") {
            let seconds: f64 = cadence
                .parse()
                .map_err(|_| anyhow!("DETECT_CADENCE_SECS must be a number of seconds"))?;
            self.cadence = parse_cadence(seconds)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(anyhow!("source must not be empty"));
        }
        self.options.validate().map_err(|e| anyhow!(e))?;
        Ok(())
    }
}

/// Convert a seconds value into a cadence interval. Rejects negative,
/// non-finite, and out-of-range values rather than panicking on them.
pub fn parse_cadence(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        anyhow!(
            "cadence must be a non-negative number of seconds, got {}",
            seconds
        )
    })
}

fn read_config_file(path: &Path) -> Result<DaemonConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = DaemonConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.cadence, Duration::from_secs(1));
    }

    #[test]
    fn negative_cadence_rejected() {
        assert!(parse_cadence(-1.0).is_err());
        assert!(parse_cadence(0.0).is_ok());
    }

    #[test]
    fn out_of_range_cadence_rejected_not_panicking() {
        assert!(parse_cadence(1e30).is_err());
        assert!(parse_cadence(f64::INFINITY).is_err());
        assert!(parse_cadence(f64::NAN).is_err());
    }

    #[test]
    fn csv_splitting_trims_and_drops_empties() {
        assert_eq!(split_csv("person, car ,,dog"), vec!["person", "car", "dog"]);
    }
}
