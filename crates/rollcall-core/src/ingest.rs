//! Still-image ingestion for enrollment from a file.

use crate::types::Frame;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Accepted still-image extensions (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("unsupported file format: {extension:?} (supported: {})", supported_list())]
    UnsupportedFormat { extension: String },
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("could not load image {} (the file may be corrupted): {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Turn a pasted or drag-and-dropped path into a plain path: trims
/// whitespace, then surrounding double quotes, then single quotes.
pub fn clean_path(input: &str) -> PathBuf {
    let trimmed = input.trim().trim_matches('"').trim_matches('\'');
    PathBuf::from(trimmed)
}

/// Check the extension allow-list, then that the file exists.
pub fn check_image_path(path: &Path) -> Result<(), IngestError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(IngestError::UnsupportedFormat { extension });
    }
    if !path.is_file() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Validate and decode a still image into a frame.
pub fn load_still(path: &Path) -> Result<Frame, IngestError> {
    check_image_path(path)?;

    let image = image::open(path).map_err(|source| IngestError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    let frame = Frame::from_color(image.into_rgb8());

    tracing::info!(
        path = %path.display(),
        width = frame.width(),
        height = frame.height(),
        "loaded still image"
    );
    Ok(frame)
}

pub fn supported_list() -> String {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(", ")
}
