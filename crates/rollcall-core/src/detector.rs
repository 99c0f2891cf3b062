//! Face locator seam.
//!
//! Detection itself is delegated to an external vision backend; this module
//! only fixes the contract and the tuning knobs passed on every call.

use crate::types::BoundingBox;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Tuning knobs for one detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocatorParams {
    /// Image pyramid scale step per pass (> 1.0).
    pub scale_factor: f64,
    /// Neighboring candidates required to keep a detection.
    pub min_neighbors: u32,
    /// Smallest face side, in pixels.
    pub min_size: u32,
}

impl LocatorParams {
    /// Live enrollment: finer pyramid and fewer neighbors, tolerant of head angle.
    pub const LIVE_ENROLL: Self = Self {
        scale_factor: 1.05,
        min_neighbors: 3,
        min_size: 80,
    };

    /// Still-image enrollment and live recognition.
    pub const STANDARD: Self = Self {
        scale_factor: 1.1,
        min_neighbors: 5,
        min_size: 100,
    };
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Returns candidate face boxes for a grayscale frame.
///
/// Order of the returned boxes carries no meaning. Implementations must be
/// stateless across frames.
pub trait FaceLocator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn locate(
        &mut self,
        gray: &GrayImage,
        params: &LocatorParams,
    ) -> Result<Vec<BoundingBox>, Self::Error>;
}
