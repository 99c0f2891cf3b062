//! In-memory stand-ins for the camera, window, terminal, locator and matcher.

use crate::detector::{FaceLocator, LocatorParams};
use crate::recognizer::FaceMatcher;
use crate::session::{Console, Display, FrameSource, Key, KeyWait, Overlay};
use crate::types::{BoundingBox, Frame, Prediction};
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(pub &'static str);

/// 160x120 color gradient.
pub fn scene() -> Frame {
    Frame::from_color(RgbImage::from_fn(160, 120, |x, y| {
        Rgb([x as u8, y as u8, ((x + y) / 2) as u8])
    }))
}

/// Uniform 24x24 face at one gray level.
pub fn flat_face(level: u8) -> GrayImage {
    GrayImage::from_pixel(24, 24, Luma([level]))
}

pub struct ScriptedSource {
    frame: Frame,
    remaining: usize,
    released: Rc<Cell<bool>>,
}

impl ScriptedSource {
    /// Yields `frame` `count` times, then fails.
    pub fn repeating(frame: Frame, count: usize) -> Self {
        Self {
            frame,
            remaining: count,
            released: Rc::default(),
        }
    }

    pub fn released(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.released)
    }
}

impl FrameSource for ScriptedSource {
    type Error = FakeError;

    fn next_frame(&mut self) -> Result<Frame, FakeError> {
        if self.remaining == 0 {
            return Err(FakeError("stream ended"));
        }
        self.remaining -= 1;
        Ok(self.frame.clone())
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.released.set(true);
    }
}

/// Returns scripted keys in order, then `Key::Nothing` forever.
pub struct ScriptedDisplay {
    keys: VecDeque<Key>,
    shown: Rc<RefCell<Vec<(Overlay, KeyWait)>>>,
    closed: Rc<Cell<bool>>,
}

impl ScriptedDisplay {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            shown: Rc::default(),
            closed: Rc::default(),
        }
    }

    pub fn shown(&self) -> Rc<RefCell<Vec<(Overlay, KeyWait)>>> {
        Rc::clone(&self.shown)
    }

    pub fn closed(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.closed)
    }
}

impl Display for ScriptedDisplay {
    type Error = FakeError;

    fn present(&mut self, _frame: &Frame, overlay: &Overlay, wait: KeyWait) -> Result<Key, FakeError> {
        self.shown.borrow_mut().push((overlay.clone(), wait));
        Ok(self.keys.pop_front().unwrap_or(Key::Nothing))
    }
}

impl Drop for ScriptedDisplay {
    fn drop(&mut self) {
        self.closed.set(true);
    }
}

/// Returns scripted detections per call, repeating the last one.
pub struct ScriptedLocator {
    script: VecDeque<Vec<BoundingBox>>,
    last: Vec<BoundingBox>,
    calls: Vec<LocatorParams>,
}

impl ScriptedLocator {
    pub fn new(script: impl IntoIterator<Item = Vec<BoundingBox>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> Vec<LocatorParams> {
        self.calls.clone()
    }
}

impl FaceLocator for ScriptedLocator {
    type Error = FakeError;

    fn locate(&mut self, _gray: &GrayImage, params: &LocatorParams) -> Result<Vec<BoundingBox>, FakeError> {
        self.calls.push(*params);
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        Ok(self.last.clone())
    }
}

/// Answers prompts from a script and records everything said.
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    pub fn saw(&self, needle: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Console for ScriptedConsole {
    fn say(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.transcript.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

/// Nearest-mean-brightness classifier; distance is the brightness gap.
#[derive(Default)]
pub struct MeanMatcher {
    means: Vec<(i32, f64)>,
    pub train_calls: Rc<Cell<usize>>,
}

fn mean(face: &GrayImage) -> f64 {
    let total: u64 = face.pixels().map(|p| p[0] as u64).sum();
    total as f64 / (face.width() * face.height()).max(1) as f64
}

impl FaceMatcher for MeanMatcher {
    type Error = FakeError;

    fn train(&mut self, faces: &[GrayImage], labels: &[i32]) -> Result<(), FakeError> {
        self.train_calls.set(self.train_calls.get() + 1);
        let mut sums: Vec<(i32, f64, usize)> = Vec::new();
        for (face, &label) in faces.iter().zip(labels) {
            match sums.iter_mut().find(|(l, _, _)| *l == label) {
                Some(entry) => {
                    entry.1 += mean(face);
                    entry.2 += 1;
                }
                None => sums.push((label, mean(face), 1)),
            }
        }
        self.means = sums
            .into_iter()
            .map(|(label, sum, n)| (label, sum / n as f64))
            .collect();
        Ok(())
    }

    fn predict(&self, face: &GrayImage) -> Result<Prediction, FakeError> {
        let probe = mean(face);
        self.means
            .iter()
            .map(|&(label, m)| Prediction {
                label,
                distance: (m - probe).abs(),
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .ok_or(FakeError("untrained"))
    }
}
