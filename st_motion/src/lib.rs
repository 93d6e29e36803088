//! ABOUTME: Three-frame differencing motion detection with noise gating
//! ABOUTME: Change-mask computation, motion judgment, and a rolling detection session

use std::collections::VecDeque;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use st_core::{Error, Result};
use tracing::{debug, info};
use validator::Validate;

pub mod differencer;
pub mod judge;
pub mod region;

pub use differencer::FrameDifferencer;
pub use judge::MotionJudge;
pub use region::{Region, Roi};

// Re-export image types for callers and benchmarks
pub use image;

/// Frames per decision: previous, current, next
pub const WINDOW_SIZE: usize = 3;

/// Configuration for the differencing pipeline
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MotionConfig {
    /// Intensity cutoff applied to the combined frame difference (0-255)
    pub noise_threshold: u8,
    /// Edge length of the square erosion window, in pixels
    #[validate(range(min = 1))]
    pub erosion_kernel_size: u32,
    /// Masks with a standard deviation at or above this are treated as global noise
    #[validate(range(exclusive_min = 0.0))]
    pub max_stddev_for_motion: f64,
    /// Scan step in both axes (1 = every pixel)
    #[validate(range(min = 1))]
    pub sample_stride: u32,
    /// Outward growth of the reported bounding region, in pixels
    #[validate(range(min = 1))]
    pub margin: u32,
}

impl Default for MotionConfig {
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

impl MotionConfig {
    /// Consume and return the config, rejecting out-of-domain values
    pub(crate) fn validated(self) -> Result<Self> {
        if let Err(errors) = self.validate() {
            return Err(Error::InvalidConfig(errors.to_string()));
        }
        Ok(self)
    }
}

/// Result of judging one frame window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionResult {
    /// Changed pixels found by the sampled scan
    pub changed_pixels: u32,
    /// Bounding region of the change, present only when pixels changed
    pub region: Option<Region>,
}

impl MotionResult {
    /// The result reported when nothing moved or the noise gate fired
    pub fn quiet() -> Self {
        Self {
            changed_pixels: 0,
            region: None,
        }
    }

    /// Whether the scan found any changed pixels
    pub fn has_motion(&self) -> bool {
        self.region.is_some()
    }
}

/// Rolling three-frame detection session.
///
/// Owns the frame window and both pipeline stages. Feed decoded grayscale
/// frames with [`advance`](Self::advance); the session judges the window once
/// it holds three frames and reports the quiet result while warming up.
pub struct DetectionSession {
    config: MotionConfig,
    differencer: FrameDifferencer,
    judge: MotionJudge,
    roi: Option<Roi>,
    window: VecDeque<GrayImage>,
}

impl DetectionSession {
    /// Create a session that scans the full frame
    pub fn new(config: MotionConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create a session restricted to a fixed scan window
    pub fn with_roi(config: MotionConfig, roi: Roi) -> Result<Self> {
        Self::build(config, Some(roi))
    }

    fn build(config: MotionConfig, roi: Option<Roi>) -> Result<Self> {
        let differencer = FrameDifferencer::new(config.clone())?;
        let judge = MotionJudge::new(config.clone())?;

        info!(?roi, "Creating detection session");

        Ok(Self {
            config,
            differencer,
            judge,
            roi,
            window: VecDeque::with_capacity(WINDOW_SIZE),
        })
    }

    /// Feed the next frame and judge the window.
    ///
    /// Frames must keep the dimensions of the first frame fed after
    /// construction or [`reset`](Self::reset).
    pub fn advance(&mut self, frame: GrayImage) -> Result<MotionResult> {
        let start_time = std::time::Instant::now();

        if let Some(front) = self.window.front() {
            if front.dimensions() != frame.dimensions() {
                return Err(Error::DimensionMismatch(format!(
                    "expected {}x{} frames, got {}x{}",
                    front.width(),
                    front.height(),
                    frame.width(),
                    frame.height()
                )));
            }
        }

        if self.window.len() == WINDOW_SIZE {
            self.window.pop_front();
        }
        self.window.push_back(frame);

        if self.window.len() < WINDOW_SIZE {
            debug!(buffered = self.window.len(), "Window warming up");
            return Ok(MotionResult::quiet());
        }

        let (prev, curr, next) = (&self.window[0], &self.window[1], &self.window[2]);
        let (width, height) = next.dimensions();
        let roi = self.roi.unwrap_or_else(|| Roi::full(width, height));

        let mask = self.differencer.compute_mask(prev, curr, next)?;
        let result = self.judge.judge(&mask, &roi)?;

        debug!(
            changed_pixels = result.changed_pixels,
            processing_time_ms = start_time.elapsed().as_millis() as u64,
            "Frame window judged"
        );

        Ok(result)
    }

    /// Feed a raw row-major grayscale buffer (one byte per pixel)
    pub fn advance_raw(
        &mut self,
        frame_data: &[u8],
        width: u32,
        height: u32,
    ) -> Result<MotionResult> {
        // Exactly one byte per pixel; truncated and padded buffers both fail
        if frame_data.len() != width as usize * height as usize {
            return Err(Error::DimensionMismatch(format!(
                "{} bytes do not form a {}x{} grayscale frame",
                frame_data.len(),
                width,
                height
            )));
        }

        let frame = GrayImage::from_raw(width, height, frame_data.to_vec()).ok_or_else(|| {
            Error::DimensionMismatch(format!("{}x{} frame dimensions overflow", width, height))
        })?;
        self.advance(frame)
    }

    /// Drop all buffered frames, e.g. after a source hiccup
    pub fn reset(&mut self) {
        debug!("Resetting detection session window");
        self.window.clear();
    }

    /// Whether the window holds enough frames to judge
    pub fn is_warm(&self) -> bool {
        self.window.len() == WINDOW_SIZE
    }

    /// Get current configuration
    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Get the fixed scan window, if any
    pub fn roi(&self) -> Option<Roi> {
        self.roi
    }
}

/// Synthetic frame and mask builders shared by tests, benches, and the demo binary
pub mod utils {
    use super::Region;
    use image::{GrayImage, ImageBuffer, Luma};

    /// Background intensity used by the synthetic builders
    const BACKGROUND: u8 = 64;

    /// Create a uniform frame at the given intensity
    pub fn uniform_frame(width: u32, height: u32, intensity: u8) -> GrayImage {
        ImageBuffer::from_pixel(width, height, Luma([intensity]))
    }

    /// Create a dark frame with one bright block
    pub fn frame_with_block(
        width: u32,
        height: u32,
        block_x: u32,
        block_y: u32,
        block_width: u32,
        block_height: u32,
        intensity: u8,
    ) -> GrayImage {
        let mut img = uniform_frame(width, height, BACKGROUND);

        for y in block_y..(block_y + block_height).min(height) {
            for x in block_x..(block_x + block_width).min(width) {
                img.put_pixel(x, y, Luma([intensity]));
            }
        }

        img
    }

    /// Create a frame triplet with a block jumping by `step` pixels per frame
    pub fn moving_block_triplet(
        width: u32,
        height: u32,
        start_x: u32,
        start_y: u32,
        block: u32,
        step: u32,
    ) -> (GrayImage, GrayImage, GrayImage) {
        (
            frame_with_block(width, height, start_x, start_y, block, block, 200),
            frame_with_block(width, height, start_x + step, start_y + step, block, block, 200),
            frame_with_block(
                width,
                height,
                start_x + 2 * step,
                start_y + 2 * step,
                block,
                block,
                200,
            ),
        )
    }

    /// Create an all-zero mask with one solid 255 block
    pub fn mask_with_block(
        width: u32,
        height: u32,
        block_x: u32,
        block_y: u32,
        block_width: u32,
        block_height: u32,
    ) -> GrayImage {
        let mut mask = GrayImage::new(width, height);

        for y in block_y..(block_y + block_height).min(height) {
            for x in block_x..(block_x + block_width).min(width) {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        mask
    }

    /// Create an alternating 0/255 checkerboard with square cells.
    ///
    /// Cells of 2x2 or larger survive the default erosion, and the pattern's
    /// standard deviation defeats any practical noise gate.
    pub fn checkerboard_frame(width: u32, height: u32, cell: u32) -> GrayImage {
        let cell = cell.max(1);
        let mut img = GrayImage::new(width, height);

        for y in 0..height {
            for x in 0..width {
                if ((x / cell) + (y / cell)) % 2 == 0 {
                    img.put_pixel(x, y, Luma([255]));
                }
            }
        }

        img
    }

    /// Crop a frame to a detected region
    pub fn crop_to_region(frame: &GrayImage, region: &Region) -> GrayImage {
        image::imageops::crop_imm(
            frame,
            region.min_x,
            region.min_y,
            region.width(),
            region.height(),
        )
        .to_image()
    }
}
