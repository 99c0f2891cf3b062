//! Enrollment sessions: live capture from a camera, or selection from a
//! still image, followed by naming and storing the crop.

use crate::detector::{FaceLocator, LocatorParams};
use crate::ingest;
use crate::session::{
    self, Annotation, CaptionStyle, Console, Display, FrameSource, Key, KeyWait, Overlay,
    SessionError, Tone, RULE,
};
use crate::store::{FaceStore, Sample, StoreError};
use crate::types::BoundingBox;
use image::GrayImage;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Capture loop state. `FaceDetected` only changes what is drawn; capture is
/// always an explicit key press. The loop runs until a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollState {
    AwaitingInput,
    FaceDetected,
    Captured,
    Cancelled,
}

impl EnrollState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EnrollState::Captured | EnrollState::Cancelled)
    }

    /// Next state after a frame with `faces` boxes was shown and `key` read.
    /// A refused capture falls back to `AwaitingInput`.
    fn step(self, faces: usize, key: Key) -> Self {
        if self.is_terminal() {
            return self;
        }
        match key {
            Key::Cancel => EnrollState::Cancelled,
            Key::Capture if faces == 1 => EnrollState::Captured,
            Key::Capture => EnrollState::AwaitingInput,
            _ if faces > 0 => EnrollState::FaceDetected,
            _ => EnrollState::AwaitingInput,
        }
    }
}

/// Why a capture key press was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRejection {
    #[error("No face detected! Please try again.")]
    NoFace,
    #[error("Multiple faces detected ({0})! Please ensure only one person is in frame.")]
    MultipleFaces(usize),
}

/// Capture needs exactly one face in view.
pub fn single_face(boxes: &[BoundingBox]) -> Result<BoundingBox, CaptureRejection> {
    match boxes {
        [] => Err(CaptureRejection::NoFace),
        [only] => Ok(*only),
        many => Err(CaptureRejection::MultipleFaces(many.len())),
    }
}

pub enum CaptureOutcome {
    Captured(GrayImage),
    Cancelled,
}

/// Result of one stored enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollReport {
    pub sample: Sample,
    /// Samples this person now has.
    pub person_samples: usize,
    /// Distinct persons in the store.
    pub total_persons: usize,
}

pub const CAPTURE_BANNER: &str = "SPACE: Capture | ESC: Cancel";
pub const CAPTURE_HINT: &str = "Press SPACE to capture";
pub const STILL_BANNER: &str = "Press any key to continue";

/// Run the live capture loop until a single face is captured or the user
/// cancels.
///
/// `source` and `display` are consumed: the camera is released and the
/// window closed before this returns, whatever the outcome.
pub fn capture_live<S, L, D, C>(
    mut source: S,
    locator: &mut L,
    mut display: D,
    params: &LocatorParams,
    console: &mut C,
) -> Result<CaptureOutcome, SessionError>
where
    S: FrameSource,
    L: FaceLocator,
    D: Display,
    C: Console + ?Sized,
{
    let mut state = EnrollState::AwaitingInput;

    loop {
        let frame = source.next_frame().map_err(SessionError::source_failed)?;
        let boxes = session::locate(locator, &frame, params)?;

        let key = display
            .present(&frame, &capture_overlay(&boxes), KeyWait::Poll)
            .map_err(SessionError::display_failed)?;

        let next = state.step(boxes.len(), key);
        if next != state {
            tracing::debug!(from = ?state, to = ?next, "enroll state");
            state = next;
        }

        match (state, single_face(&boxes)) {
            (EnrollState::Captured, Ok(face)) => {
                tracing::info!(?face, "face captured");
                console.say("");
                console.say("✓ Face captured successfully!");
                return Ok(CaptureOutcome::Captured(face.crop(&frame.gray)));
            }
            (EnrollState::Cancelled, _) => {
                tracing::info!("enrollment cancelled");
                console.say("");
                console.say("Enrollment cancelled.");
                return Ok(CaptureOutcome::Cancelled);
            }
            (_, Err(rejection)) if key == Key::Capture => {
                tracing::debug!(%rejection, "capture rejected");
                console.say(&rejection.to_string());
            }
            _ => {}
        }
    }
}

/// Overlay for the live capture window.
pub fn capture_overlay(boxes: &[BoundingBox]) -> Overlay {
    Overlay {
        banner: Some(CAPTURE_BANNER.to_string()),
        annotations: boxes
            .iter()
            .map(|&bbox| Annotation {
                bbox,
                caption: Some(CAPTURE_HINT.to_string()),
                style: CaptionStyle::Above,
                tone: Tone::Positive,
            })
            .collect(),
    }
}

/// Overlay numbering every face found in a still image.
pub fn still_overlay(boxes: &[BoundingBox]) -> Overlay {
    Overlay {
        banner: Some(STILL_BANNER.to_string()),
        annotations: boxes
            .iter()
            .enumerate()
            .map(|(i, &bbox)| Annotation {
                bbox,
                caption: Some(format!("Face {}", i + 1)),
                style: CaptionStyle::Above,
                tone: Tone::Positive,
            })
            .collect(),
    }
}

/// Ask which of `count` faces to use (1-based on screen) until a valid answer
/// arrives. Returns the 0-based index.
pub fn choose_face<C: Console + ?Sized>(console: &mut C, count: usize) -> io::Result<usize> {
    loop {
        let answer = console.ask(&format!("Which face to enroll? (1-{count}): "))?;
        match answer.trim().parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => return Ok(n - 1),
            Ok(_) => console.say(&format!("Please enter a number between 1 and {count}")),
            Err(_) => console.say("Please enter a valid number"),
        }
    }
}

/// Ask for a name and store `face` under it.
///
/// An empty or unusable name writes nothing and returns `Ok(None)`.
pub fn commit_sample<C: Console + ?Sized>(
    store: &FaceStore,
    console: &mut C,
    face: &GrayImage,
) -> Result<Option<EnrollReport>, SessionError> {
    console.say("");
    console.say(RULE);
    let answer = console.ask("Enter the person's name: ")?;
    let name = answer.trim();

    if name.is_empty() {
        console.say("Error: Name cannot be empty!");
        return Ok(None);
    }

    let sample = match store.append_sample(name, face) {
        Ok(sample) => sample,
        Err(StoreError::InvalidName { reason, .. }) => {
            console.say(&format!("Error: {reason}!"));
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let total_persons = store.person_count()?;

    console.say("");
    console.say(&format!("✓ Face enrolled successfully for '{name}'!"));
    console.say(&format!("✓ Saved to: {}", sample.path.display()));
    console.say(&format!("✓ Total images for {name}: {}", sample.index));
    console.say(&format!("✓ Total enrolled people: {total_persons}"));

    Ok(Some(EnrollReport {
        person_samples: sample.index,
        total_persons,
        sample,
    }))
}

/// Enroll one face from a still image.
///
/// Every detected face is shown numbered until a key is pressed; the window
/// is closed before any prompt. With several faces the user picks one.
pub fn enroll_still<L, D, C>(
    store: &FaceStore,
    path: &Path,
    locator: &mut L,
    mut display: D,
    params: &LocatorParams,
    console: &mut C,
) -> Result<Option<EnrollReport>, SessionError>
where
    L: FaceLocator,
    D: Display,
    C: Console + ?Sized,
{
    if let Some(file_name) = path.file_name() {
        console.say("");
        console.say(&format!("Loading image: {}", file_name.to_string_lossy()));
    }
    let frame = ingest::load_still(path)?;

    console.say("Detecting faces...");
    let boxes = session::locate(locator, &frame, params)?;

    if boxes.is_empty() {
        drop(display);
        console.say("");
        console.say("Error: No face detected in the image!");
        console.say("Tips:");
        console.say("- Ensure the face is clearly visible");
        console.say("- Try a different image with better lighting");
        console.say(&format!(
            "- Face should be at least {0}x{0} pixels",
            params.min_size
        ));
        return Ok(None);
    }

    display
        .present(&frame, &still_overlay(&boxes), KeyWait::Block)
        .map_err(SessionError::display_failed)?;
    drop(display);

    let chosen = if boxes.len() > 1 {
        console.say("");
        console.say(&format!("{} faces detected in the image.", boxes.len()));
        choose_face(console, boxes.len())?
    } else {
        console.say("");
        console.say("✓ 1 face detected");
        0
    };
    tracing::info!(face = chosen + 1, of = boxes.len(), bbox = ?boxes[chosen], "face selected");

    let crop = boxes[chosen].crop(&frame.gray);
    commit_sample(store, console, &crop)
}

/// Question asked after a successful enrollment.
pub struct RepeatPrompt {
    pub question: &'static str,
    /// Shown after a "y", followed by a wait for Enter.
    pub ready_hint: Option<&'static str>,
}

pub const ANOTHER_ANGLE: RepeatPrompt = RepeatPrompt {
    question: "💡 Capture another angle for better recognition? (y/n): ",
    ready_hint: Some("Great! Turn your head slightly and capture another angle."),
};

pub const ANOTHER_IMAGE: RepeatPrompt = RepeatPrompt {
    question: "Would you like to enroll another image? (y/n): ",
    ready_hint: None,
};

/// Run `attempt` until it stores nothing or the user declines another round.
/// Returns the number of samples stored.
pub fn repeat_enrollment<C, F>(
    console: &mut C,
    prompt: &RepeatPrompt,
    mut attempt: F,
) -> Result<usize, SessionError>
where
    C: Console + ?Sized,
    F: FnMut(&mut C) -> Result<Option<EnrollReport>, SessionError>,
{
    let mut stored = 0;

    while attempt(&mut *console)?.is_some() {
        stored += 1;

        console.say("");
        console.say(RULE);
        if !session::confirm(console, prompt.question)? {
            break;
        }
        console.say("");
        if let Some(hint) = prompt.ready_hint {
            console.say(hint);
            console.ask("Press Enter when ready...")?;
        }
        tracing::debug!(stored, "starting another enrollment round");
    }

    Ok(stored)
}
