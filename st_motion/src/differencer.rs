//! ABOUTME: Three-frame differencing stage producing binary change masks
//! ABOUTME: Double absolute difference, AND combine, threshold, and speckle erosion

use crate::MotionConfig;
use image::GrayImage;
use st_core::{Error, Result};
use tracing::debug;

/// Turns three consecutive grayscale frames into a binary change mask.
///
/// A pixel is flagged only when it changed between `prev` and `next` and
/// between `curr` and `next`, which rejects transients that appear in a
/// single frame.
pub struct FrameDifferencer {
    config: MotionConfig,
}

impl FrameDifferencer {
    /// Create a differencer with a validated configuration
    pub fn new(config: MotionConfig) -> Result<Self> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    /// Compute the binary change mask for a (prev, curr, next) window.
    ///
    /// Mask pixels are 255 where the thresholded double difference fired and
    /// 0 everywhere else. All three frames must share the same dimensions.
    pub fn compute_mask(
        &self,
        prev: &GrayImage,
        curr: &GrayImage,
        next: &GrayImage,
    ) -> Result<GrayImage> {
        let (width, height) = next.dimensions();
        if prev.dimensions() != (width, height) || curr.dimensions() != (width, height) {
            return Err(Error::DimensionMismatch(format!(
                "frame window is not uniform: prev {}x{}, curr {}x{}, next {}x{}",
                prev.width(),
                prev.height(),
                curr.width(),
                curr.height(),
                width,
                height
            )));
        }

        let threshold = self.config.noise_threshold;
        // Containers may carry slack bytes past width*height; only the logical
        // frame enters the mask
        let frame_len = width as usize * height as usize;
        let mut mask = vec![0u8; frame_len];
        let mut candidates = 0u32;

        let diffs = prev.iter().zip(curr.iter()).zip(next.iter()).take(frame_len);
        for (i, ((p, c), n)) in diffs.enumerate() {
            let d1 = p.abs_diff(*n);
            let d2 = n.abs_diff(*c);
            if (d1 & d2) > threshold {
                mask[i] = 255;
                candidates += 1;
            }
        }

        if self.config.erosion_kernel_size > 1 {
            mask = erode(&mask, width, height, self.config.erosion_kernel_size);
        }

        let kept = mask.iter().filter(|&&p| p == 255).count() as u32;
        debug!(candidates, kept, "Change mask computed");

        GrayImage::from_raw(width, height, mask).ok_or_else(|| {
            Error::DimensionMismatch("mask buffer does not match frame dimensions".to_string())
        })
    }
}

/// Minimum-filter erosion over a binary mask.
///
/// A pixel survives only when every pixel in the `kernel` x `kernel` window
/// anchored at it (clipped at the frame edge) is 255.
fn erode(mask: &[u8], width: u32, height: u32, kernel: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let k = kernel as usize;
    let mut out = vec![0u8; mask.len()];

    for y in 0..h {
        let y_end = (y + k).min(h);
        for x in 0..w {
            if mask[y * w + x] != 255 {
                continue;
            }

            let x_end = (x + k).min(w);
            let mut keep = true;
            'window: for wy in y..y_end {
                let row = wy * w;
                for wx in x..x_end {
                    if mask[row + wx] != 255 {
                        keep = false;
                        break 'window;
                    }
                }
            }

            if keep {
                out[y * w + x] = 255;
            }
        }
    }

    out
}
