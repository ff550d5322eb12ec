use crate::core::cluster::{ClusterConfig, Group, cluster};
use crate::core::extract::{ExtractError, PhotoExtractor, PhotoRecord, is_supported_format};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("Failed to list {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub processed: usize,
    pub total: usize,
    pub current_file: String,
}

/// Receives per-file progress during extraction.
pub trait ProgressSink {
    fn report(&self, progress: &ScanProgress);

    fn finish(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmptyReason {
    /// No file in the input directory has a supported extension.
    NoEligibleFiles,
    /// Eligible files exist but none could be decoded.
    NothingReadable { eligible: usize },
}

/// Result of analysing an input folder. Empty is a normal outcome.
#[derive(Debug)]
pub enum Analysis {
    Empty(EmptyReason),
    Grouped(Vec<Group>),
}

impl Analysis {
    pub fn groups(&self) -> &[Group] {
        match self {
            Analysis::Empty(_) => &[],
            Analysis::Grouped(groups) => groups,
        }
    }
}

/// List supported files directly inside `dir`, in directory listing order.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::InvalidPath {
            path: dir.display().to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: dir.display().to_string(),
            source,
        })?;
        // `Path::is_file` follows symlinks, so linked photos are kept.
        if entry.path().is_file() && is_supported_format(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Extract every file in order, dropping unreadable ones.
pub fn extract_records(
    extractor: &PhotoExtractor,
    files: &[PathBuf],
    progress: Option<&dyn ProgressSink>,
) -> Vec<PhotoRecord> {
    let total = files.len();
    let mut records = Vec::with_capacity(total);

    for (index, file_path) in files.iter().enumerate() {
        match extractor.extract_record(file_path) {
            Ok(record) => records.push(record),
            Err(ExtractError::Unreadable { path, reason }) => {
                log::debug!("Skipping {}: {}", path, reason);
            }
        }

        if let Some(sink) = progress {
            sink.report(&ScanProgress {
                processed: index + 1,
                total,
                current_file: file_path.to_string_lossy().to_string(),
            });
        }
    }

    if let Some(sink) = progress {
        sink.finish();
    }
    records
}

/// Discover, extract and cluster the photos in `input_dir`.
pub fn analyze(
    input_dir: &Path,
    config: &ClusterConfig,
    progress: Option<&dyn ProgressSink>,
) -> Result<Analysis, ScanError> {
    let files = discover_files(input_dir)?;
    if files.is_empty() {
        log::info!("No supported photos in {}", input_dir.display());
        return Ok(Analysis::Empty(EmptyReason::NoEligibleFiles));
    }

    let extractor = PhotoExtractor::new();
    let records = extract_records(&extractor, &files, progress);
    if records.is_empty() {
        return Ok(Analysis::Empty(EmptyReason::NothingReadable {
            eligible: files.len(),
        }));
    }

    log::info!("Extracted {} of {} photo(s)", records.len(), files.len());
    Ok(Analysis::Grouped(cluster(records, config)))
}
