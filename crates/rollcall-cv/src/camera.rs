//! Camera capture via OpenCV `videoio`.

use crate::convert;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use rollcall_core::{Frame, FrameSource};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("could not open camera {0}")]
    Unavailable(i32),
    #[error("failed to capture frame from camera {0}")]
    CaptureFailed(i32),
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// An open camera. The device is released when this is dropped.
pub struct Camera {
    capture: VideoCapture,
    pub index: i32,
    pub width: u32,
    pub height: u32,
}

impl Camera {
    /// Open the camera at `index` (0 = default device).
    pub fn open(index: i32) -> Result<Self, CameraError> {
        let capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(CameraError::Unavailable(index));
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let backend = capture.get_backend_name().unwrap_or_default();

        tracing::info!(index, width, height, %backend, "opened camera");

        Ok(Self {
            capture,
            index,
            width,
            height,
        })
    }

    /// Read the next raw BGR frame. An empty or failed read is an error; it is
    /// never retried.
    pub fn read_bgr(&mut self) -> Result<Mat, CameraError> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Err(CameraError::CaptureFailed(self.index));
        }
        Ok(frame)
    }
}

impl FrameSource for Camera {
    type Error = CameraError;

    fn next_frame(&mut self) -> Result<Frame, CameraError> {
        let bgr = self.read_bgr()?;
        Ok(convert::frame_from_bgr(&bgr)?)
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        match self.capture.release() {
            Ok(()) => tracing::debug!(index = self.index, "released camera"),
            Err(e) => tracing::warn!(index = self.index, error = %e, "camera release failed"),
        }
    }
}
