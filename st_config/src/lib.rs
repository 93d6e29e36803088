//! ABOUTME: Configuration management with validation and environment loading
//! ABOUTME: Handles detector, scan-window, and trigger settings from the environment

use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use st_core::{Error, Result};
use st_motion::{MotionConfig, Roi};
use validator::Validate;

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub detector: DetectorConfig,
    pub roi: Option<RoiConfig>,
    #[validate(nested)]
    pub trigger: TriggerConfig,
}

/// Detection algorithm settings
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct DetectorConfig {
    /// Intensity cutoff applied to the combined frame difference (0-255)
    pub noise_threshold: u8,
    /// Edge length of the square erosion window, in pixels
    #[validate(range(min = 1, max = 15))]
    pub erosion_kernel_size: u32,
    /// Masks with a standard deviation at or above this are treated as global noise
    #[validate(range(exclusive_min = 0.0, max = 255.0))]
    pub max_stddev_for_motion: f64,
    /// Scan step in both axes (1 = every pixel)
    #[validate(range(min = 1, max = 64))]
    pub sample_stride: u32,
    /// Outward growth of the reported bounding region, in pixels
    #[validate(range(min = 1, max = 512))]
    pub margin: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            noise_threshold: 35,
            erosion_kernel_size: 2,
            max_stddev_for_motion: 20.0,
            sample_stride: 2,
            margin: 10,
        }
    }
}

impl From<DetectorConfig> for MotionConfig {
    fn from(config: DetectorConfig) -> Self {
        Self {
            noise_threshold: config.noise_threshold,
            erosion_kernel_size: config.erosion_kernel_size,
            max_stddev_for_motion: config.max_stddev_for_motion,
            sample_stride: config.sample_stride,
            margin: config.margin,
        }
    }
}

/// Fixed scan window with exclusive stops
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoiConfig {
    pub x_start: u32,
    pub x_stop: u32,
    pub y_start: u32,
    pub y_stop: u32,
}

impl From<RoiConfig> for Roi {
    fn from(config: RoiConfig) -> Self {
        Self {
            x_start: config.x_start,
            x_stop: config.x_stop,
            y_start: config.y_start,
            y_stop: config.y_stop,
        }
    }
}

/// Caller policy for when a result counts as a reportable motion event
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TriggerConfig {
    /// Minimum sampled changed-pixel count treated as motion
    #[validate(range(min = 1))]
    pub min_changed_pixels: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            min_changed_pixels: 5,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and optional .env file
    pub fn load() -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // Set defaults first
        builder = builder
            .set_default("detector.noise_threshold", 35)?
            .set_default("detector.erosion_kernel_size", 2)?
            .set_default("detector.max_stddev_for_motion", 20.0)?
            .set_default("detector.sample_stride", 2)?
            .set_default("detector.margin", 10)?
            .set_default("trigger.min_changed_pixels", 5)?;

        // Handle nested environment variables that don't work with the standard separator
        let nested_keys = [
            ("STAKEOUT_DETECTOR_NOISE_THRESHOLD", "detector.noise_threshold"),
            ("STAKEOUT_DETECTOR_EROSION_KERNEL_SIZE", "detector.erosion_kernel_size"),
            ("STAKEOUT_DETECTOR_MAX_STDDEV_FOR_MOTION", "detector.max_stddev_for_motion"),
            ("STAKEOUT_DETECTOR_SAMPLE_STRIDE", "detector.sample_stride"),
            ("STAKEOUT_TRIGGER_MIN_CHANGED_PIXELS", "trigger.min_changed_pixels"),
            ("STAKEOUT_ROI_X_START", "roi.x_start"),
            ("STAKEOUT_ROI_X_STOP", "roi.x_stop"),
            ("STAKEOUT_ROI_Y_START", "roi.y_start"),
            ("STAKEOUT_ROI_Y_STOP", "roi.y_stop"),
        ];
        for (var, key) in nested_keys {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(key, value)?;
            }
        }

        // Try to load from .env file if it exists (optional)
        if std::path::Path::new(".env").exists() {
            builder = builder.add_source(File::with_name(".env").required(false));
        }

        // Load from environment variables with STAKEOUT_ prefix (highest priority)
        builder = builder.add_source(
            Environment::with_prefix("STAKEOUT")
                .try_parsing(true)
                .separator("_"),
        );

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))?;

        // Validate the configuration
        parsed
            .validate()
            .map_err(|e| Error::Config(format!("Config validation failed: {}", e)))?;

        // The scan window cannot be cross-checked field-by-field
        if let Some(roi) = &parsed.roi {
            if roi.x_start >= roi.x_stop || roi.y_start >= roi.y_stop {
                return Err(Error::Config(format!(
                    "Scan window is inverted or empty: {:?}",
                    roi
                )));
            }
        }

        Ok(parsed)
    }

    /// Detector settings as the core pipeline config
    pub fn motion_config(&self) -> MotionConfig {
        self.detector.clone().into()
    }

    /// Fixed scan window, if one was configured
    pub fn scan_window(&self) -> Option<Roi> {
        self.roi.clone().map(Into::into)
    }
}
