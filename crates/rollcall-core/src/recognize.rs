//! Live recognition: train once on the whole store, then label every face
//! in every frame until the user quits.

use crate::detector::{FaceLocator, LocatorParams};
use crate::recognizer::{FaceMatcher, MatchPolicy, TrainedRecognizer, TrainingSet};
use crate::session::{
    self, Annotation, CaptionStyle, Console, Display, FrameSource, Key, KeyWait, Overlay,
    SessionError, Tone,
};
use crate::store::FaceStore;
use crate::types::{BoundingBox, Frame};

pub const RECOGNIZE_BANNER: &str = "Press 'q' to quit";

/// Load every sample from `store` and train `matcher` on it.
///
/// An empty store fails with [`TrainingError::NoSamples`](crate::recognizer::TrainingError::NoSamples)
/// before the matcher is touched.
pub fn prepare<M, C>(
    store: &FaceStore,
    matcher: M,
    policy: MatchPolicy,
    console: &mut C,
) -> Result<TrainedRecognizer<M>, SessionError>
where
    M: FaceMatcher,
    C: Console + ?Sized,
{
    let set = TrainingSet::load(store)?;

    console.say("");
    console.say(&format!("✓ Loaded {} face images", set.len()));
    console.say(&format!("✓ Known people: {}", set.label_map.names().join(", ")));
    console.say("");
    console.say("Training face recognizer...");

    let recognizer = TrainedRecognizer::train(matcher, set, policy)?;
    console.say("✓ Training complete!");
    Ok(recognizer)
}

/// Identify each box independently and build the overlay for this frame.
pub fn identify_faces<M: FaceMatcher>(
    recognizer: &TrainedRecognizer<M>,
    frame: &Frame,
    boxes: &[BoundingBox],
) -> Result<Overlay, SessionError> {
    let mut annotations = Vec::with_capacity(boxes.len());
    for &bbox in boxes {
        let identity = recognizer
            .identify(&bbox.crop(&frame.gray))
            .map_err(SessionError::matcher_failed)?;
        annotations.push(Annotation {
            bbox,
            tone: if identity.is_known() { Tone::Positive } else { Tone::Negative },
            caption: Some(identity.to_string()),
            style: CaptionStyle::BarBelow,
        });
    }

    Ok(Overlay {
        banner: Some(RECOGNIZE_BANNER.to_string()),
        annotations,
    })
}

/// Run the recognition loop until the quit key. Returns the number of frames
/// shown.
///
/// `source` and `display` are consumed and released on return.
pub fn recognize_live<S, L, M, D, C>(
    mut source: S,
    locator: &mut L,
    recognizer: &TrainedRecognizer<M>,
    mut display: D,
    params: &LocatorParams,
    console: &mut C,
) -> Result<usize, SessionError>
where
    S: FrameSource,
    L: FaceLocator,
    M: FaceMatcher,
    D: Display,
    C: Console + ?Sized,
{
    let mut frames = 0usize;

    loop {
        let frame = source.next_frame().map_err(SessionError::source_failed)?;
        let boxes = session::locate(locator, &frame, params)?;
        let overlay = identify_faces(recognizer, &frame, &boxes)?;
        frames += 1;

        let key = display
            .present(&frame, &overlay, KeyWait::Poll)
            .map_err(SessionError::display_failed)?;
        if key == Key::Quit {
            break;
        }
    }

    tracing::info!(frames, "recognition stopped");
    console.say("");
    console.say("Exiting...");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{
        flat_face, scene, MeanMatcher, ScriptedConsole, ScriptedDisplay, ScriptedLocator,
        ScriptedSource,
    };
    use crate::recognizer::TrainingError;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn store_with(persons: &[(&str, u8)]) -> (TempDir, FaceStore) {
        let dir = TempDir::new().unwrap();
        let store = FaceStore::new(dir.path().join("known_faces"));
        for &(name, level) in persons {
            store.append_sample(name, &flat_face(level)).unwrap();
        }
        (dir, store)
    }

    /// Dark band, mid-gray band, bright band.
    fn banded_frame() -> Frame {
        Frame::from_color(RgbImage::from_fn(160, 60, |x, _| match x {
            0..=59 => Rgb([10, 10, 10]),
            60..=109 => Rgb([110, 110, 110]),
            _ => Rgb([200, 200, 200]),
        }))
    }

    #[test]
    fn test_empty_store_skips_training() {
        let (_dir, store) = store_with(&[]);
        let matcher = MeanMatcher::default();
        let train_calls = matcher.train_calls.clone();
        let mut console = ScriptedConsole::new(Vec::<&str>::new());

        let err = prepare(&store, matcher, MatchPolicy::default(), &mut console)
            .err()
            .unwrap();

        assert!(matches!(err, SessionError::Training(TrainingError::NoSamples(_))));
        assert!(err.to_string().contains("no enrolled faces"));
        assert_eq!(train_calls.get(), 0);
    }

    #[test]
    fn test_prepare_reports_known_people() {
        let (_dir, store) = store_with(&[("bob", 200), ("ada", 10), ("ada", 12)]);
        let matcher = MeanMatcher::default();
        let train_calls = matcher.train_calls.clone();
        let mut console = ScriptedConsole::new(Vec::<&str>::new());

        let recognizer = prepare(&store, matcher, MatchPolicy::default(), &mut console).unwrap();

        assert_eq!(train_calls.get(), 1);
        assert_eq!(recognizer.label_map().names(), &["ada", "bob"]);
        assert!(console.saw("Loaded 3 face images"));
        assert!(console.saw("Known people: ada, bob"));
    }

    #[test]
    fn test_each_face_identified_independently() {
        let (_dir, store) = store_with(&[("ada", 10), ("bob", 200)]);
        let mut console = ScriptedConsole::new(Vec::<&str>::new());
        let recognizer = prepare(
            &store,
            MeanMatcher::default(),
            MatchPolicy { threshold: 20.0 },
            &mut console,
        )
        .unwrap();

        let boxes = [
            BoundingBox::new(5, 5, 40, 40),
            BoundingBox::new(65, 5, 40, 40),
            BoundingBox::new(115, 5, 40, 40),
        ];
        let overlay = identify_faces(&recognizer, &banded_frame(), &boxes).unwrap();

        assert_eq!(overlay.banner.as_deref(), Some(RECOGNIZE_BANNER));
        let tones: Vec<Tone> = overlay.annotations.iter().map(|a| a.tone).collect();
        assert_eq!(tones, vec![Tone::Positive, Tone::Negative, Tone::Positive]);

        let captions: Vec<String> = overlay
            .annotations
            .iter()
            .map(|a| a.caption.clone().unwrap())
            .collect();
        assert!(captions[0].starts_with("ada ("), "{captions:?}");
        assert_eq!(captions[1], "Unknown");
        assert!(captions[2].starts_with("bob ("), "{captions:?}");
        assert!(overlay.annotations.iter().all(|a| a.style == CaptionStyle::BarBelow));
    }

    #[test]
    fn test_loop_runs_until_quit() {
        let (_dir, store) = store_with(&[("ada", 10)]);
        let mut console = ScriptedConsole::new(Vec::<&str>::new());
        let recognizer =
            prepare(&store, MeanMatcher::default(), MatchPolicy::default(), &mut console).unwrap();

        let source = ScriptedSource::repeating(scene(), 100);
        let released = source.released();
        let display = ScriptedDisplay::new([Key::Nothing, Key::Capture, Key::Cancel, Key::Quit]);
        let closed = display.closed();
        let mut locator = ScriptedLocator::new([vec![BoundingBox::new(0, 0, 20, 20)]]);

        let frames = recognize_live(
            source,
            &mut locator,
            &recognizer,
            display,
            &LocatorParams::STANDARD,
            &mut console,
        )
        .unwrap();

        assert_eq!(frames, 4);
        assert!(released.get() && closed.get());
        assert!(console.saw("Exiting..."));
        assert!(locator.calls().iter().all(|p| *p == LocatorParams::STANDARD));
    }

    #[test]
    fn test_read_failure_ends_session() {
        let (_dir, store) = store_with(&[("ada", 10)]);
        let mut console = ScriptedConsole::new(Vec::<&str>::new());
        let recognizer =
            prepare(&store, MeanMatcher::default(), MatchPolicy::default(), &mut console).unwrap();

        let source = ScriptedSource::repeating(scene(), 2);
        let display = ScriptedDisplay::new(Vec::<Key>::new());
        let closed = display.closed();
        let mut locator = ScriptedLocator::new([vec![]]);

        let err = recognize_live(
            source,
            &mut locator,
            &recognizer,
            display,
            &LocatorParams::STANDARD,
            &mut console,
        )
        .unwrap_err();

        assert!(matches!(err, SessionError::Source(_)));
        assert!(closed.get());
    }
}
