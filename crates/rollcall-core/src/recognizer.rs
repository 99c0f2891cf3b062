//! Training and recognition on top of an external face matcher.
//!
//! The matcher is keyed by integer labels; [`LabelMap`] ties those labels to
//! person names for a single training pass. Labels are handed out in sorted
//! name order so the same store always yields the same mapping.

use crate::store::{FaceStore, StoreError};
use crate::types::{Identity, Prediction};
use image::GrayImage;
use std::path::PathBuf;
use thiserror::Error;

/// Distances at or above this are reported as unknown.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 70.0;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("no enrolled faces found in {}; enroll at least one person first", .0.display())]
    NoSamples(PathBuf),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("face matcher training failed: {0}")]
    Matcher(#[source] BoxError),
}

/// Batch-trained classifier for cropped grayscale faces.
pub trait FaceMatcher {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Replace any previous model with one trained on `faces`/`labels`
    /// (same length, one label per face).
    fn train(&mut self, faces: &[GrayImage], labels: &[i32]) -> Result<(), Self::Error>;

    /// Closest label for one region, with its distance (lower = closer).
    fn predict(&self, face: &GrayImage) -> Result<Prediction, Self::Error>;
}

/// Label <-> person name mapping for one training pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    names: Vec<String>,
}

impl LabelMap {
    /// Register `name` and return its label.
    fn push(&mut self, name: String) -> i32 {
        self.names.push(name);
        (self.names.len() - 1) as i32
    }

    pub fn name(&self, label: i32) -> Option<&str> {
        usize::try_from(label)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    pub fn label(&self, name: &str) -> Option<i32> {
        self.names.iter().position(|n| n == name).map(|i| i as i32)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Every decodable sample in the store, tagged with its person's label.
pub struct TrainingSet {
    pub faces: Vec<GrayImage>,
    pub labels: Vec<i32>,
    pub label_map: LabelMap,
}

impl TrainingSet {
    /// Load all samples from `store`.
    ///
    /// Persons without a single readable sample get no label. Unreadable
    /// files are skipped with a warning. An empty result is
    /// [`TrainingError::NoSamples`].
    pub fn load(store: &FaceStore) -> Result<Self, TrainingError> {
        let mut faces = Vec::new();
        let mut labels = Vec::new();
        let mut label_map = LabelMap::default();

        for person in store.list_persons()? {
            let mut loaded = Vec::new();
            for sample in store.samples_for(&person)? {
                match store.load_sample(&sample) {
                    Ok(face) => loaded.push(face),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable sample"),
                }
            }
            if loaded.is_empty() {
                tracing::debug!(person = %person.name, "no samples; not labeled");
                continue;
            }

            let label = label_map.push(person.name);
            labels.extend(std::iter::repeat(label).take(loaded.len()));
            faces.extend(loaded);
        }

        if faces.is_empty() {
            return Err(TrainingError::NoSamples(store.root().to_path_buf()));
        }

        tracing::info!(
            faces = faces.len(),
            persons = label_map.len(),
            "loaded training set"
        );

        Ok(Self {
            faces,
            labels,
            label_map,
        })
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Acceptance rule turning a raw prediction into an identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    pub threshold: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl MatchPolicy {
    /// Only a distance strictly below the threshold is accepted; a NaN on
    /// either side is Unknown.
    pub fn classify(&self, prediction: Prediction, labels: &LabelMap) -> Identity {
        let accepted = prediction.distance < self.threshold;
        if !accepted {
            return Identity::Unknown;
        }
        match labels.name(prediction.label) {
            Some(name) => Identity::Known {
                name: name.to_string(),
                confidence: confidence_percent(prediction.distance),
            },
            None => {
                tracing::warn!(label = prediction.label, "matcher returned unmapped label");
                Identity::Unknown
            }
        }
    }
}

/// Display percentage for a distance: `max(0, 100 - distance)`.
pub fn confidence_percent(distance: f64) -> f64 {
    (100.0 - distance).max(0.0)
}

/// A matcher trained on a [`TrainingSet`], together with its label mapping.
pub struct TrainedRecognizer<M> {
    matcher: M,
    label_map: LabelMap,
    policy: MatchPolicy,
}

impl<M: FaceMatcher> TrainedRecognizer<M> {
    pub fn train(mut matcher: M, set: TrainingSet, policy: MatchPolicy) -> Result<Self, TrainingError> {
        matcher
            .train(&set.faces, &set.labels)
            .map_err(|e| TrainingError::Matcher(Box::new(e)))?;
        tracing::info!(faces = set.faces.len(), threshold = policy.threshold, "matcher trained");

        Ok(Self {
            matcher,
            label_map: set.label_map,
            policy,
        })
    }

    /// Classify one cropped face region.
    pub fn identify(&self, face: &GrayImage) -> Result<Identity, M::Error> {
        let prediction = self.matcher.predict(face)?;
        let identity = self.policy.classify(prediction, &self.label_map);
        tracing::debug!(
            label = prediction.label,
            distance = prediction.distance,
            %identity,
            "identified region"
        );
        Ok(identity)
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }
}
