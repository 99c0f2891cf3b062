//! rollcall-cv — OpenCV backends for rollcall-core.
//!
//! Implements the core seams on top of OpenCV:
//! - [`Camera`]: `FrameSource` over `videoio::VideoCapture`
//! - [`HaarLocator`]: `FaceLocator` using a Haar cascade
//! - [`LbphMatcher`]: `FaceMatcher` using LBPH histograms
//! - [`Window`]: `Display` using a highgui window
//!
//! Frames cross into core as `image` buffers, so nothing above this crate
//! depends on OpenCV types.

pub mod camera;
pub mod cascade;
pub mod convert;
pub mod lbph;
pub mod window;

pub use camera::{Camera, CameraError};
pub use cascade::{default_cascade_path, CascadeError, HaarLocator};
pub use lbph::{LbphMatcher, MatcherError};
pub use window::Window;
