//! Preview window via OpenCV `highgui`.

use crate::convert;
use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::highgui;
use opencv::imgproc;
use opencv::prelude::*;
use rollcall_core::session::{Annotation, CaptionStyle, Tone};
use rollcall_core::{Display, Frame, Key, KeyWait, Overlay};

const KEY_SPACE: i32 = 32;
const KEY_ESCAPE: i32 = 27;
const KEY_QUIT: i32 = b'q' as i32;

/// Height of the filled caption bar drawn under a recognized face.
const CAPTION_BAR_HEIGHT: i32 = 35;

/// A named highgui window. Created on first use, destroyed on drop.
pub struct Window {
    title: String,
    created: bool,
}

impl Window {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            created: false,
        }
    }

    fn ensure_created(&mut self) -> opencv::Result<()> {
        if !self.created {
            highgui::named_window(&self.title, highgui::WINDOW_AUTOSIZE)?;
            self.created = true;
            tracing::debug!(title = %self.title, "opened preview window");
        }
        Ok(())
    }
}

impl Display for Window {
    type Error = opencv::Error;

    fn present(
        &mut self,
        frame: &Frame,
        overlay: &Overlay,
        wait: KeyWait,
    ) -> Result<Key, opencv::Error> {
        self.ensure_created()?;

        let mut canvas = convert::rgb_to_bgr_mat(&frame.color)?;
        draw_overlay(&mut canvas, overlay)?;
        highgui::imshow(&self.title, &canvas)?;

        let delay = match wait {
            KeyWait::Poll => 1,
            KeyWait::Block => 0,
        };
        Ok(decode_key(highgui::wait_key(delay)?))
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if !self.created {
            return;
        }
        if let Err(e) = highgui::destroy_window(&self.title) {
            tracing::warn!(title = %self.title, error = %e, "failed to close window");
        }
        // highgui only processes the close on the next event pump.
        let _ = highgui::wait_key(1);
    }
}

fn decode_key(code: i32) -> Key {
    if code < 0 {
        return Key::Nothing;
    }
    match code & 0xff {
        KEY_SPACE => Key::Capture,
        KEY_ESCAPE => Key::Cancel,
        KEY_QUIT => Key::Quit,
        _ => Key::Other,
    }
}

/// BGR color for a tone.
fn tone_color(tone: Tone) -> Scalar {
    match tone {
        Tone::Positive => Scalar::new(0.0, 255.0, 0.0, 0.0),
        Tone::Negative => Scalar::new(0.0, 0.0, 255.0, 0.0),
    }
}

fn white() -> Scalar {
    Scalar::new(255.0, 255.0, 255.0, 0.0)
}

fn draw_overlay(canvas: &mut Mat, overlay: &Overlay) -> opencv::Result<()> {
    for annotation in &overlay.annotations {
        draw_annotation(canvas, annotation)?;
    }

    if let Some(banner) = &overlay.banner {
        imgproc::put_text(
            canvas,
            banner,
            Point::new(10, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.7,
            white(),
            2,
            imgproc::LINE_8,
            false,
        )?;
    }
    Ok(())
}

fn draw_annotation(canvas: &mut Mat, annotation: &Annotation) -> opencv::Result<()> {
    let color = tone_color(annotation.tone);
    let b = annotation.bbox;
    let (x, y, w, h) = (b.x as i32, b.y as i32, b.width as i32, b.height as i32);

    imgproc::rectangle(canvas, Rect::new(x, y, w, h), color, 2, imgproc::LINE_8, 0)?;

    let Some(caption) = &annotation.caption else {
        return Ok(());
    };

    match annotation.style {
        CaptionStyle::Above => imgproc::put_text(
            canvas,
            caption,
            Point::new(x, (y - 10).max(12)),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.5,
            color,
            2,
            imgproc::LINE_8,
            false,
        ),
        CaptionStyle::BarBelow => {
            imgproc::rectangle(
                canvas,
                Rect::new(x, y + h, w, CAPTION_BAR_HEIGHT),
                color,
                imgproc::FILLED,
                imgproc::LINE_8,
                0,
            )?;
            imgproc::put_text(
                canvas,
                caption,
                Point::new(x + 6, y + h + 25),
                imgproc::FONT_HERSHEY_DUPLEX,
                0.6,
                white(),
                1,
                imgproc::LINE_8,
                false,
            )
        }
    }
}
