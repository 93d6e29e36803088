//! ABOUTME: Motion judgment over binary change masks
//! ABOUTME: Global noise gating, strided scanning, and margin-expanded bounding regions

use crate::region::{Region, Roi};
use crate::{MotionConfig, MotionResult};
use image::GrayImage;
use st_core::{Error, Result};
use tracing::debug;

/// Decides whether a change mask represents genuine localized motion
pub struct MotionJudge {
    config: MotionConfig,
}

impl MotionJudge {
    /// Create a judge with a validated configuration
    pub fn new(config: MotionConfig) -> Result<Self> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    /// Judge one mask, scanning only inside `roi`.
    ///
    /// The noise gate always sees the whole mask: a globally chaotic mask
    /// (lighting flip, camera shake) is rejected before any scanning happens.
    pub fn judge(&self, mask: &GrayImage, roi: &Roi) -> Result<MotionResult> {
        let (width, height) = mask.dimensions();
        if !roi.fits(width, height) {
            return Err(Error::DimensionMismatch(format!(
                "scan window {:?} does not fit a {}x{} mask",
                roi, width, height
            )));
        }

        let stddev = mask_stddev(mask);
        if stddev >= self.config.max_stddev_for_motion {
            debug!(
                stddev,
                max_stddev = self.config.max_stddev_for_motion,
                "Mask rejected by noise gate"
            );
            return Ok(MotionResult::quiet());
        }

        let data = mask.as_raw();
        let stride = self.config.sample_stride as usize;
        let w = width as usize;

        let mut changed_pixels = 0u32;
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;

        for y in (roi.y_start..roi.y_stop).step_by(stride) {
            let row = y as usize * w;
            for x in (roi.x_start..roi.x_stop).step_by(stride) {
                if data[row + x as usize] == 255 {
                    changed_pixels += 1;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        if changed_pixels == 0 {
            return Ok(MotionResult::quiet());
        }

        let bounds = Region {
            min_x,
            min_y,
            max_x,
            max_y,
        };
        let region = bounds.expand_clamped(self.config.margin, width, height);

        debug!(changed_pixels, ?region, stddev, "Motion located");

        Ok(MotionResult {
            changed_pixels,
            region: Some(region),
        })
    }
}

/// Population standard deviation of the logical mask pixels
fn mask_stddev(mask: &GrayImage) -> f64 {
    let len = mask.width() as usize * mask.height() as usize;
    if len == 0 {
        return 0.0;
    }

    // Ignore any container slack past width*height
    let data = &mask.as_raw()[..len];
    let count = len as f64;
    let mean = data.iter().map(|&p| p as f64).sum::<f64>() / count;
    let variance = data
        .iter()
        .map(|&p| {
            let delta = p as f64 - mean;
            delta * delta
        })
        .sum::<f64>()
        / count;

    variance.sqrt()
}
