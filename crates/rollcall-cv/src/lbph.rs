//! LBPH face matcher (OpenCV `face` contrib module).
//!
//! Local Binary Pattern Histograms: distances are chi-square histogram
//! distances, typically 50–70 for a good match on webcam crops.

use crate::convert;
use opencv::core::{Mat, Ptr, Vector};
use opencv::face::LBPHFaceRecognizer;
use opencv::prelude::*;
use rollcall_core::{FaceMatcher, Prediction};
use image::GrayImage;
use thiserror::Error;

const LBPH_RADIUS: i32 = 1;
const LBPH_NEIGHBORS: i32 = 8;
const LBPH_GRID_X: i32 = 8;
const LBPH_GRID_Y: i32 = 8;
/// Acceptance is decided by the caller's policy; the model itself rejects nothing.
const LBPH_THRESHOLD: f64 = f64::MAX;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("matcher has not been trained")]
    Untrained,
    #[error("{faces} faces but {labels} labels")]
    LabelMismatch { faces: usize, labels: usize },
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub struct LbphMatcher {
    model: Ptr<LBPHFaceRecognizer>,
    trained: bool,
}

impl LbphMatcher {
    pub fn new() -> Result<Self, MatcherError> {
        let model = LBPHFaceRecognizer::create(
            LBPH_RADIUS,
            LBPH_NEIGHBORS,
            LBPH_GRID_X,
            LBPH_GRID_Y,
            LBPH_THRESHOLD,
        )?;
        Ok(Self {
            model,
            trained: false,
        })
    }
}

impl FaceMatcher for LbphMatcher {
    type Error = MatcherError;

    fn train(&mut self, faces: &[GrayImage], labels: &[i32]) -> Result<(), MatcherError> {
        if faces.len() != labels.len() {
            return Err(MatcherError::LabelMismatch {
                faces: faces.len(),
                labels: labels.len(),
            });
        }

        let images = faces
            .iter()
            .map(convert::gray_to_mat)
            .collect::<opencv::Result<Vector<Mat>>>()?;
        let labels = Vector::<i32>::from_slice(labels);

        self.model.train(&images, &labels)?;
        self.trained = true;
        tracing::debug!(faces = faces.len(), "LBPH model trained");
        Ok(())
    }

    fn predict(&self, face: &GrayImage) -> Result<Prediction, MatcherError> {
        if !self.trained {
            return Err(MatcherError::Untrained);
        }

        let mat = convert::gray_to_mat(face)?;
        let mut label = -1;
        let mut distance = 0.0;
        self.model.predict(&mat, &mut label, &mut distance)?;
        Ok(Prediction { label, distance })
    }
}
