//! Directory-backed face store.
//!
//! Layout: `<root>/<person>/<person>_<n>.jpg`, one directory per person,
//! samples numbered from 1. Samples are only ever appended.
//!
//! The next sample number is derived by counting existing files, then
//! writing. Two sessions enrolling the same person at once can pick the same
//! number and one sample overwrites the other.

use crate::types::PersonSummary;
use image::{GrayImage, ImageFormat};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extension of every sample written by enrollment.
pub const SAMPLE_EXTENSION: &str = "jpg";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write sample {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to read sample {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A person directory in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub dir: PathBuf,
}

/// One stored face image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub person: String,
    /// 1-based sequence number parsed from the file name; 0 for files that
    /// don't follow the `<person>_<n>` pattern.
    pub index: usize,
    pub path: PathBuf,
}

pub struct FaceStore {
    root: PathBuf,
}

impl FaceStore {
    /// Open a store rooted at `root`. Nothing is created until the first sample
    /// is appended.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All person directories, sorted by name. A missing root is an empty store.
    pub fn list_persons(&self) -> Result<Vec<Person>, StoreError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        let mut persons = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::warn!(path = %path.display(), "skipping non-UTF-8 person directory");
                continue;
            };
            persons.push(Person { name, dir: path });
        }

        persons.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(persons)
    }

    /// Samples of one person, ordered by sequence number.
    pub fn samples_for(&self, person: &Person) -> Result<Vec<Sample>, StoreError> {
        let mut samples: Vec<Sample> = sample_files(&person.dir)?
            .into_iter()
            .map(|path| Sample {
                index: sample_index(&person.name, &path).unwrap_or(0),
                person: person.name.clone(),
                path,
            })
            .collect();
        samples.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));
        Ok(samples)
    }

    /// Decode a stored sample as grayscale.
    pub fn load_sample(&self, sample: &Sample) -> Result<GrayImage, StoreError> {
        let image = image::open(&sample.path).map_err(|source| StoreError::Decode {
            path: sample.path.clone(),
            source,
        })?;
        Ok(image.into_luma8())
    }

    /// Store `face` as the next sample of `name`, creating the person if needed.
    pub fn append_sample(&self, name: &str, face: &GrayImage) -> Result<Sample, StoreError> {
        validate_name(name)?;

        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let existing = sample_files(&dir)?.len();
        let index = existing + 1;
        let path = dir.join(format!("{name}_{index}.{SAMPLE_EXTENSION}"));

        face.save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|source| StoreError::Encode {
                path: path.clone(),
                source,
            })?;

        tracing::info!(
            person = name,
            index,
            width = face.width(),
            height = face.height(),
            path = %path.display(),
            "stored sample"
        );

        Ok(Sample {
            person: name.to_string(),
            index,
            path,
        })
    }

    /// Number of person directories.
    pub fn person_count(&self) -> Result<usize, StoreError> {
        Ok(self.list_persons()?.len())
    }

    /// Persons with their sample counts, sorted by name.
    pub fn summaries(&self) -> Result<Vec<PersonSummary>, StoreError> {
        self.list_persons()?
            .into_iter()
            .map(|person| {
                let samples = sample_files(&person.dir)?.len();
                Ok(PersonSummary {
                    name: person.name,
                    samples,
                })
            })
            .collect()
    }
}

/// Reject names that can't be used verbatim as a single directory name.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    let reason = if name.is_empty() {
        Some("name cannot be empty")
    } else if name == "." || name == ".." {
        Some("name cannot be a relative path component")
    } else if name.contains(['/', '\\']) {
        Some("name cannot contain path separators")
    } else if name.chars().any(char::is_control) {
        Some("name cannot contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn sample_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = std::fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StoreError::io(dir, e))?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SAMPLE_EXTENSION) {
            files.push(path);
        }
    }
    Ok(files)
}

fn sample_index(person: &str, path: &Path) -> Option<usize> {
    path.file_stem()?
        .to_str()?
        .strip_prefix(person)?
        .strip_prefix('_')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use tempfile::TempDir;

    fn face(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]))
    }

    fn store() -> (TempDir, FaceStore) {
        let dir = TempDir::new().unwrap();
        let store = FaceStore::new(dir.path().join("known_faces"));
        (dir, store)
    }

    #[test]
    fn test_missing_root_is_empty() {
        let (_dir, store) = store();
        assert!(store.list_persons().unwrap().is_empty());
        assert_eq!(store.person_count().unwrap(), 0);
        assert!(!store.root().exists(), "listing must not create the root");
    }

    #[test]
    fn test_append_numbers_contiguously() {
        let (_dir, store) = store();
        for expected in 1..=4 {
            let sample = store.append_sample("ada", &face(20, 20)).unwrap();
            assert_eq!(sample.index, expected);
            assert_eq!(
                sample.path.file_name().unwrap().to_str().unwrap(),
                format!("ada_{expected}.jpg")
            );
        }

        let persons = store.list_persons().unwrap();
        assert_eq!(persons.len(), 1);
        let indices: Vec<usize> = store
            .samples_for(&persons[0])
            .unwrap()
            .iter()
            .map(|s| s.index)
            .collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_samples_sorted_numerically() {
        let (_dir, store) = store();
        for _ in 0..11 {
            store.append_sample("bob", &face(8, 8)).unwrap();
        }
        let person = &store.list_persons().unwrap()[0];
        let samples = store.samples_for(person).unwrap();
        assert_eq!(samples.len(), 11);
        assert_eq!(samples[1].index, 2, "bob_10 must not sort before bob_2");
        assert_eq!(samples[10].index, 11);
    }

    #[test]
    fn test_persons_sorted_and_files_ignored() {
        let (_dir, store) = store();
        store.append_sample("zoe", &face(8, 8)).unwrap();
        store.append_sample("ada", &face(8, 8)).unwrap();
        store.append_sample("Mia", &face(8, 8)).unwrap();
        std::fs::write(store.root().join("README.txt"), "not a person").unwrap();

        let names: Vec<String> = store
            .list_persons()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Mia", "ada", "zoe"]);
        assert_eq!(store.person_count().unwrap(), 3);
    }

    #[test]
    fn test_other_extensions_not_counted() {
        let (_dir, store) = store();
        store.append_sample("ada", &face(8, 8)).unwrap();
        std::fs::write(store.root().join("ada").join("notes.txt"), "x").unwrap();
        std::fs::write(store.root().join("ada").join("old.png"), "x").unwrap();

        let sample = store.append_sample("ada", &face(8, 8)).unwrap();
        assert_eq!(sample.index, 2);
    }

    #[test]
    fn test_empty_person_directory_allowed() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.root().join("carol")).unwrap();
        store.append_sample("ada", &face(8, 8)).unwrap();

        let summaries = store.summaries().unwrap();
        assert_eq!(
            summaries,
            vec![
                PersonSummary { name: "ada".into(), samples: 1 },
                PersonSummary { name: "carol".into(), samples: 0 },
            ]
        );
    }

    #[test]
    fn test_sample_roundtrip_keeps_dimensions() {
        let (_dir, store) = store();
        let crop = face(37, 53);
        let sample = store.append_sample("ada", &crop).unwrap();
        let loaded = store.load_sample(&sample).unwrap();
        assert_eq!(loaded.dimensions(), (37, 53));
    }

    #[test]
    fn test_invalid_names_rejected_without_writing() {
        let (_dir, store) = store();
        for name in ["", ".", "..", "a/b", "a\\b", "tab\there"] {
            let err = store.append_sample(name, &face(8, 8)).unwrap_err();
            assert!(matches!(err, StoreError::InvalidName { .. }), "{name:?}: {err}");
        }
        assert!(!store.root().exists());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let (_dir, store) = store();
        store.append_sample("Ada", &face(8, 8)).unwrap();
        let sample = store.append_sample("ada", &face(8, 8)).unwrap();
        // On case-insensitive filesystems both land in one directory.
        if store.person_count().unwrap() == 2 {
            assert_eq!(sample.index, 1);
        }
    }

    #[test]
    fn test_decode_error_on_corrupt_sample() {
        let (_dir, store) = store();
        let sample = store.append_sample("ada", &face(8, 8)).unwrap();
        std::fs::write(&sample.path, b"not a jpeg").unwrap();
        assert!(matches!(
            store.load_sample(&sample),
            Err(StoreError::Decode { .. })
        ));
    }
}
