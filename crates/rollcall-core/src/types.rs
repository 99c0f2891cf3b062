use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned face box in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Copy this region out of a grayscale frame.
    ///
    /// The box is clipped to the frame, so a box hanging over the edge yields
    /// a smaller crop rather than a panic.
    pub fn crop(&self, gray: &GrayImage) -> GrayImage {
        let x = self.x.min(gray.width());
        let y = self.y.min(gray.height());
        let width = self.width.min(gray.width() - x);
        let height = self.height.min(gray.height() - y);
        image::imageops::crop_imm(gray, x, y, width, height).to_image()
    }
}

/// One frame from an image source, kept in color for display and in
/// grayscale for detection and matching.
#[derive(Clone, Debug)]
pub struct Frame {
    pub color: RgbImage,
    pub gray: GrayImage,
}

impl Frame {
    pub fn from_color(color: RgbImage) -> Self {
        let gray = image::imageops::grayscale(&color);
        Self { color, gray }
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }
}

/// Raw matcher output for one region: integer label plus distance (lower = closer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: i32,
    pub distance: f64,
}

/// Who a region was recognized as.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Known {
        name: String,
        /// Derived percentage in [0, 100]; higher = closer match.
        confidence: f64,
    },
    Unknown,
}

impl Identity {
    pub fn is_known(&self) -> bool {
        matches!(self, Identity::Known { .. })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Known { name, confidence } => write!(f, "{name} ({confidence:.1}%)"),
            Identity::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Enrolled person with the number of samples on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub name: String,
    pub samples: usize,
}
