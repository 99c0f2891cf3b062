//! Interaction seams shared by the enroll and recognize sessions.
//!
//! Sessions are written against these traits so the camera, the preview
//! window and the terminal can be swapped for fakes. Sources and displays are
//! taken by value and dropped when the session returns, which releases the
//! device and closes the window on every exit path.

use crate::detector::LocatorParams;
use crate::ingest::IngestError;
use crate::recognizer::TrainingError;
use crate::store::StoreError;
use crate::types::{BoundingBox, Frame};
use std::io;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("image source failed: {0}")]
    Source(#[source] BoxError),
    #[error("face detection failed: {0}")]
    Locator(#[source] BoxError),
    #[error("display failed: {0}")]
    Display(#[source] BoxError),
    #[error("face matching failed: {0}")]
    Matcher(#[source] BoxError),
    #[error("console: {0}")]
    Console(#[from] io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Training(#[from] TrainingError),
}

impl SessionError {
    pub fn source_failed<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        Self::Source(Box::new(e))
    }

    pub fn locator_failed<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        Self::Locator(Box::new(e))
    }

    pub fn display_failed<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        Self::Display(Box::new(e))
    }

    pub fn matcher_failed<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        Self::Matcher(Box::new(e))
    }
}

/// Produces frames one at a time. A failed read ends the session.
pub trait FrameSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn next_frame(&mut self) -> Result<Frame, Self::Error>;
}

/// Key observed while a frame was on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Space.
    Capture,
    /// Escape.
    Cancel,
    /// `q`.
    Quit,
    Other,
    /// No key pressed within the poll interval.
    Nothing,
}

/// How long `present` waits for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWait {
    /// Return almost immediately (live loops).
    Poll,
    /// Block until any key is pressed.
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Green.
    Positive,
    /// Red.
    Negative,
}

/// Where a caption sits relative to its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionStyle {
    /// Plain text just above the box.
    Above,
    /// White text on a filled bar under the box.
    BarBelow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub bbox: BoundingBox,
    pub caption: Option<String>,
    pub style: CaptionStyle,
    pub tone: Tone,
}

/// Everything drawn on top of a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub banner: Option<String>,
    pub annotations: Vec<Annotation>,
}

/// A window that shows frames and reports key presses.
pub trait Display {
    type Error: std::error::Error + Send + Sync + 'static;

    fn present(&mut self, frame: &Frame, overlay: &Overlay, wait: KeyWait)
        -> Result<Key, Self::Error>;
}

/// Line-oriented user dialogue.
pub trait Console {
    fn say(&mut self, line: &str);

    /// Show `prompt` and read one line, without the trailing newline.
    /// End of input is an `UnexpectedEof` error.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;
}

/// Ask a yes/no question; only `y` (any case) counts as yes.
pub fn confirm<C: Console + ?Sized>(console: &mut C, question: &str) -> io::Result<bool> {
    let answer = console.ask(question)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Locate faces in `frame`, boxing the backend error.
pub(crate) fn locate<L: crate::detector::FaceLocator>(
    locator: &mut L,
    frame: &Frame,
    params: &LocatorParams,
) -> Result<Vec<BoundingBox>, SessionError> {
    let boxes = locator
        .locate(&frame.gray, params)
        .map_err(SessionError::locator_failed)?;
    tracing::trace!(faces = boxes.len(), "located faces");
    Ok(boxes)
}

pub const RULE: &str = "--------------------------------------------------";
pub const DOUBLE_RULE: &str = "==================================================";
