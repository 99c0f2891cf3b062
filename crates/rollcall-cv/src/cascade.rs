//! Haar cascade face locator (OpenCV `objdetect`).

use crate::convert;
use opencv::core::{Rect, Size, Vector};
use opencv::objdetect::{self, CascadeClassifier};
use opencv::prelude::*;
use rollcall_core::{BoundingBox, FaceLocator, LocatorParams};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Frontal face model shipped with OpenCV.
pub const FRONTAL_FACE_CASCADE: &str = "haarcascade_frontalface_default.xml";

/// Where distribution and Homebrew packages install the cascade files.
const CASCADE_DIRS: [&str; 5] = [
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/opt/homebrew/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/usr/local/share/opencv/haarcascades",
];

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("face cascade not found: {0} (set ROLLCALL_CASCADE_PATH or cascade_path in the config)")]
    NotFound(String),
    #[error("face cascade {0} is empty or invalid")]
    Invalid(String),
    #[error("detection {name} {value} is out of range")]
    ParamOutOfRange { name: &'static str, value: u32 },
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// First standard install location holding the frontal face cascade.
pub fn default_cascade_path() -> Option<PathBuf> {
    CASCADE_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(FRONTAL_FACE_CASCADE))
        .find(|path| path.is_file())
}

pub struct HaarLocator {
    classifier: CascadeClassifier,
}

impl HaarLocator {
    /// Load a cascade XML file.
    pub fn load(path: &Path) -> Result<Self, CascadeError> {
        let display = path.display().to_string();
        if !path.is_file() {
            return Err(CascadeError::NotFound(display));
        }

        let classifier = CascadeClassifier::new(&path.to_string_lossy())?;
        if classifier.empty()? {
            return Err(CascadeError::Invalid(display));
        }

        tracing::info!(path = %display, "loaded face cascade");
        Ok(Self { classifier })
    }
}

impl FaceLocator for HaarLocator {
    type Error = CascadeError;

    fn locate(
        &mut self,
        gray: &image::GrayImage,
        params: &LocatorParams,
    ) -> Result<Vec<BoundingBox>, CascadeError> {
        let min = param_i32("min_size", params.min_size)?;
        let min_neighbors = param_i32("min_neighbors", params.min_neighbors)?;
        let mat = convert::gray_to_mat(gray)?;
        let mut faces = Vector::<Rect>::new();

        self.classifier.detect_multi_scale(
            &mat,
            &mut faces,
            params.scale_factor,
            min_neighbors,
            objdetect::CASCADE_SCALE_IMAGE,
            Size::new(min, min),
            Size::default(),
        )?;

        Ok(faces.iter().map(rect_to_box).collect())
    }
}

fn param_i32(name: &'static str, value: u32) -> Result<i32, CascadeError> {
    i32::try_from(value).map_err(|_| CascadeError::ParamOutOfRange { name, value })
}

fn rect_to_box(rect: Rect) -> BoundingBox {
    BoundingBox::new(
        rect.x.max(0) as u32,
        rect.y.max(0) as u32,
        rect.width.max(0) as u32,
        rect.height.max(0) as u32,
    )
}
