//! Optional post-process over an organized event tree: ask for tags per
//! folder and fold them into the file names.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rename {from} → {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Tag prompt failed for {folder}: {message}")]
    Prompt { folder: PathBuf, message: String },
}

/// Supplies the tag string for one folder. Called once per non-empty folder,
/// top-down; nothing is carried over between calls.
pub trait TagPrompt {
    fn tags_for(&mut self, folder: &Path, files: &[String]) -> Result<String, TagError>;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TagReport {
    pub folders: usize,
    pub renamed: usize,
    pub skipped: usize,
}

/// `"a, b,,c "` → `"_#a_#b_#c"`.
pub fn tag_suffix(tags: &str) -> String {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("_#{}", t))
        .collect()
}

/// New name for `file_name` in `folder_name`, or `None` when the suffix is
/// empty or already applied.
pub fn tagged_name(folder_name: &str, file_name: &str, suffix: &str) -> Option<String> {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if stem.contains(suffix) {
        return None;
    }
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    Some(format!("{}_{}{}{}", folder_name, stem, suffix, ext))
}

fn visible_files(folder: &Path) -> Result<Vec<String>, TagError> {
    let read_dir_err = |source| TagError::ReadDir {
        path: folder.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(folder).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if entry.file_type().map_err(read_dir_err)?.is_file() {
            files.push(name);
        }
    }
    Ok(files)
}

/// Walk `event_root` (itself included) and tag every folder that has files.
pub fn apply_tags(event_root: &Path, prompt: &mut dyn TagPrompt) -> Result<TagReport, TagError> {
    // Collect first so renames below cannot disturb the walk.
    let mut folders = Vec::new();
    for entry in WalkDir::new(event_root) {
        let entry = entry.map_err(|source| TagError::Walk {
            path: event_root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() {
            folders.push(entry.into_path());
        }
    }

    let mut report = TagReport::default();
    for folder in folders {
        let files = visible_files(&folder)?;
        if files.is_empty() {
            continue;
        }

        let tags = prompt.tags_for(&folder, &files)?;
        let suffix = tag_suffix(&tags);
        report.folders += 1;
        let folder_name = folder
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        for file_name in &files {
            let Some(new_name) = tagged_name(&folder_name, file_name, &suffix) else {
                continue;
            };
            let from = folder.join(file_name);
            let to = folder.join(&new_name);
            if to.exists() {
                log::warn!("{} already exists, not renaming {}", to.display(), file_name);
                report.skipped += 1;
                continue;
            }
            fs::rename(&from, &to).map_err(|source| TagError::Rename {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;
            report.renamed += 1;
        }
    }

    Ok(report)
}
