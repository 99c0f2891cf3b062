//! Conversions between OpenCV `Mat`s and `image` buffers.

use image::{GrayImage, RgbImage};
use opencv::core::{self, Mat};
use opencv::imgproc;
use opencv::prelude::*;
use rollcall_core::Frame;

/// Convert a BGR camera frame into a core [`Frame`].
pub fn frame_from_bgr(bgr: &Mat) -> opencv::Result<Frame> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(bgr, &mut rgb, imgproc::COLOR_BGR2RGB)?;

    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let data = rgb.data_bytes()?.to_vec();
    let color = RgbImage::from_raw(width, height, data).ok_or_else(|| {
        opencv::Error::new(
            core::StsUnmatchedSizes,
            format!("frame buffer does not match {width}x{height} RGB"),
        )
    })?;
    Ok(Frame::from_color(color))
}

/// Copy a grayscale image into a single-channel `Mat`.
pub fn gray_to_mat(gray: &GrayImage) -> opencv::Result<Mat> {
    let flat = Mat::from_slice(gray.as_raw())?;
    let shaped = flat.reshape(1, gray.height() as i32)?;
    shaped.try_clone()
}

/// Copy an RGB image into a BGR `Mat` ready for drawing and display.
pub fn rgb_to_bgr_mat(rgb: &RgbImage) -> opencv::Result<Mat> {
    let flat = Mat::from_slice(rgb.as_raw())?;
    let shaped = flat.reshape(3, rgb.height() as i32)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&shaped, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_gray_to_mat_shape_and_pixels() {
        let gray = GrayImage::from_fn(5, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let mat = gray_to_mat(&gray).unwrap();
        assert_eq!((mat.cols(), mat.rows(), mat.channels()), (5, 3, 1));
        assert_eq!(*mat.at_2d::<u8>(2, 4).unwrap(), 42);
    }

    #[test]
    fn test_rgb_bgr_roundtrip() {
        let rgb = RgbImage::from_fn(4, 2, |x, y| Rgb([x as u8, y as u8, 200]));
        let bgr = rgb_to_bgr_mat(&rgb).unwrap();
        assert_eq!((bgr.cols(), bgr.rows(), bgr.channels()), (4, 2, 3));

        let frame = frame_from_bgr(&bgr).unwrap();
        assert_eq!(frame.color, rgb);
        assert_eq!(frame.gray.dimensions(), (4, 2));
    }
}
