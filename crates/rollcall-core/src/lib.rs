//! rollcall-core — Face enrollment and recognition pipeline.
//!
//! Stores cropped grayscale faces per person on disk, trains a matcher on
//! them and drives the interactive enroll/recognize sessions. Detection,
//! matching, capture and display are reached through traits and supplied by
//! a vision backend.

pub mod detector;
pub mod enroll;
pub mod ingest;
pub mod recognize;
pub mod recognizer;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
mod fakes;

pub use detector::{FaceLocator, LocatorParams};
pub use recognizer::{FaceMatcher, LabelMap, MatchPolicy, TrainedRecognizer, TrainingError, TrainingSet};
pub use session::{Console, Display, FrameSource, Key, KeyWait, Overlay, SessionError};
pub use store::{FaceStore, Person, Sample, StoreError};
pub use types::{BoundingBox, Frame, Identity, PersonSummary, Prediction};
