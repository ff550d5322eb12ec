use crate::core::exif::{self as capture, TimeSource};
use crate::core::hash::PerceptualHasher;
use chrono::NaiveDateTime;
use image::ImageReader;
use image_hasher::ImageHash;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions eligible for analysis, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "heic"];

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file could not be decoded or dated. Callers skip it without
    /// reporting anything to the user.
    #[error("Unreadable photo {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// One analysed photo. Paths are unique within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    pub path: PathBuf,
    pub hash: ImageHash,
    pub time: NaiveDateTime,
}

impl PhotoRecord {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

pub fn is_supported_format(file_path: &Path) -> bool {
    file_path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Decodes photos and pulls out the (hash, capture time) pair clustering needs.
pub struct PhotoExtractor {
    hasher: PerceptualHasher,
}

impl PhotoExtractor {
    pub fn new() -> Self {
        Self {
            hasher: PerceptualHasher::new(),
        }
    }

    pub fn extract(&self, file_path: &Path) -> Result<(ImageHash, NaiveDateTime), ExtractError> {
        let unreadable = |reason: String| ExtractError::Unreadable {
            path: file_path.display().to_string(),
            reason,
        };

        let image = ImageReader::open(file_path)
            .map_err(|e| unreadable(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| unreadable(e.to_string()))?
            .decode()
            .map_err(|e| unreadable(e.to_string()))?;
        let hash = self.hasher.hash_image(&image);

        let (time, source) =
            capture::capture_time(file_path).map_err(|e| unreadable(e.to_string()))?;
        if source == TimeSource::Modified {
            log::debug!("No capture time in {}, using mtime", file_path.display());
        }

        Ok((hash, time))
    }

    pub fn extract_record(&self, file_path: &Path) -> Result<PhotoRecord, ExtractError> {
        let (hash, time) = self.extract(file_path)?;
        Ok(PhotoRecord {
            path: file_path.to_path_buf(),
            hash,
            time,
        })
    }
}

impl Default for PhotoExtractor {
    fn default() -> Self {
        Self::new()
    }
}
