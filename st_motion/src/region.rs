//! ABOUTME: Rectangle types used by the detection pipeline
//! ABOUTME: Inclusive-corner bounding regions and exclusive-stop scan windows

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding rectangle with inclusive corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Region {
    /// Width in pixels (both corners count)
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Height in pixels (both corners count)
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Whether the pixel coordinate falls inside the region
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Grow the region outward by `margin` on every side, clamped to a
    /// `frame_width` x `frame_height` frame
    pub fn expand_clamped(&self, margin: u32, frame_width: u32, frame_height: u32) -> Region {
        Region {
            min_x: self.min_x.saturating_sub(margin),
            min_y: self.min_y.saturating_sub(margin),
            max_x: self.max_x.saturating_add(margin).min(frame_width.saturating_sub(1)),
            max_y: self.max_y.saturating_add(margin).min(frame_height.saturating_sub(1)),
        }
    }
}

/// Scan window restricting judgment to `[x_start, x_stop) x [y_start, y_stop)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x_start: u32,
    pub x_stop: u32,
    pub y_start: u32,
    pub y_stop: u32,
}

impl Roi {
    /// Window covering an entire `width` x `height` frame
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x_start: 0,
            x_stop: width,
            y_start: 0,
            y_stop: height,
        }
    }

    /// Whether the window is non-inverted and lies within `width` x `height`
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x_start <= self.x_stop
            && self.y_start <= self.y_stop
            && self.x_stop <= width
            && self.y_stop <= height
    }
}
