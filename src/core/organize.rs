use crate::core::cluster::Group;
use crate::core::extract::PhotoRecord;
use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read size of {path}: {source}")]
    FileSize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move {from} → {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Path has no file name: {path}")]
    NoFileName { path: PathBuf },
}

impl OrganizeError {
    /// The path the failure is about.
    pub fn path(&self) -> &Path {
        match self {
            OrganizeError::CreateDir { path, .. }
            | OrganizeError::FileSize { path, .. }
            | OrganizeError::NoFileName { path } => path,
            OrganizeError::Move { from, .. } => from,
        }
    }
}

/// Quarter-day buckets used for finer folder names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..6 => TimeSlot::Night,
            6..12 => TimeSlot::Morning,
            12..18 => TimeSlot::Afternoon,
            _ => TimeSlot::Evening,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeSlot::Night => "night",
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
        }
    }
}

/// Subfolder name for a best shot taken at `time`.
pub fn folder_label(time: NaiveDateTime, use_time_slots: bool) -> String {
    let date = time.format("%Y-%m-%d").to_string();
    if use_time_slots {
        format!("{}_{}", date, TimeSlot::from_hour(time.hour()).label())
    } else {
        date
    }
}

#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    pub storage_root: PathBuf,
    pub review_root: PathBuf,
    pub event_name: String,
    pub use_time_slots: bool,
}

impl OrganizeOptions {
    pub fn event_root(&self) -> PathBuf {
        self.storage_root.join(&self.event_name)
    }
}

/// What a run did. `event_root` is the curated tree handed to tagging.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizeReport {
    pub event_root: PathBuf,
    pub groups: usize,
    pub kept: usize,
    pub moved_to_review: usize,
    pub skipped_existing: usize,
}

enum MoveOutcome {
    Moved,
    Skipped,
}

/// Pick the largest file; the first one seen wins a tie.
pub fn select_representative(group: &Group) -> Result<usize, OrganizeError> {
    largest_of(group.members.iter())
}

/// Index of the largest file among `members`, 0 when there are none.
fn largest_of<'a>(
    members: impl IntoIterator<Item = &'a PhotoRecord>,
) -> Result<usize, OrganizeError> {
    let mut best: Option<(usize, u64)> = None;
    for (index, member) in members.into_iter().enumerate() {
        let size = fs::metadata(&member.path)
            .map_err(|source| OrganizeError::FileSize {
                path: member.path.clone(),
                source,
            })?
            .len();
        match best {
            Some((_, best_size)) if size <= best_size => {}
            _ => best = Some((index, size)),
        }
    }
    Ok(best.map(|(index, _)| index).unwrap_or(0))
}

/// Files best shots into `storage_root/event_name/<date[_slot]>` and moves
/// the rest of each group into the flat review folder.
pub struct Organizer {
    options: OrganizeOptions,
    moved_sources: HashSet<PathBuf>,
}

impl Organizer {
    pub fn new(options: OrganizeOptions) -> Self {
        Self {
            options,
            moved_sources: HashSet::new(),
        }
    }

    pub fn organize(&mut self, groups: &[Group]) -> Result<OrganizeReport, OrganizeError> {
        create_dir(&self.options.storage_root)?;
        create_dir(&self.options.review_root)?;

        let mut report = OrganizeReport {
            event_root: self.options.event_root(),
            ..Default::default()
        };

        for group in groups {
            self.organize_group(group, &mut report)?;
            report.groups += 1;
        }

        log::info!(
            "Organized {} group(s): {} kept, {} to review, {} skipped",
            report.groups,
            report.kept,
            report.moved_to_review,
            report.skipped_existing
        );
        Ok(report)
    }

    fn organize_group(
        &mut self,
        group: &Group,
        report: &mut OrganizeReport,
    ) -> Result<(), OrganizeError> {
        // Members moved earlier by this organizer are no longer at their source.
        let (done, pending): (Vec<&PhotoRecord>, Vec<&PhotoRecord>) = group
            .members
            .iter()
            .partition(|m| self.moved_sources.contains(&m.path));
        for record in &done {
            log::warn!("{} was already moved in this run", record.path.display());
        }
        report.skipped_existing += done.len();
        if pending.is_empty() {
            return Ok(());
        }

        let best_index = largest_of(pending.iter().copied())?;
        let best = pending[best_index];

        let target_dir = self
            .options
            .event_root()
            .join(folder_label(best.time, self.options.use_time_slots));
        create_dir(&target_dir)?;

        match self.move_into(best, &target_dir)? {
            MoveOutcome::Moved => report.kept += 1,
            MoveOutcome::Skipped => report.skipped_existing += 1,
        }

        let review_root = self.options.review_root.clone();
        for (index, extra) in pending.iter().enumerate() {
            if index == best_index {
                continue;
            }
            match self.move_into(extra, &review_root)? {
                MoveOutcome::Moved => report.moved_to_review += 1,
                MoveOutcome::Skipped => report.skipped_existing += 1,
            }
        }

        Ok(())
    }

    fn move_into(&mut self, record: &PhotoRecord, dir: &Path) -> Result<MoveOutcome, OrganizeError> {
        if self.moved_sources.contains(&record.path) {
            log::warn!("{} was already moved in this run", record.path.display());
            return Ok(MoveOutcome::Skipped);
        }

        let file_name = record
            .path
            .file_name()
            .ok_or_else(|| OrganizeError::NoFileName {
                path: record.path.clone(),
            })?;
        let dest = dir.join(file_name);

        if dest.exists() {
            log::debug!(
                "{} already exists, leaving {} in place",
                dest.display(),
                record.path.display()
            );
            return Ok(MoveOutcome::Skipped);
        }

        move_file(&record.path, &dest).map_err(|source| OrganizeError::Move {
            from: record.path.clone(),
            to: dest.clone(),
            source,
        })?;
        log::debug!("Moved {} → {}", record.path.display(), dest.display());
        self.moved_sources.insert(record.path.clone());
        Ok(MoveOutcome::Moved)
    }
}

fn create_dir(path: &Path) -> Result<(), OrganizeError> {
    fs::create_dir_all(path).map_err(|source| OrganizeError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Rename, falling back to copy + delete across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
        Err(e) => Err(e),
    }
}

/// Copy `from` to `to` and delete `from`. A failed copy leaves nothing at `to`.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    if let Err(e) = fs::copy(from, to) {
        if let Err(cleanup) = fs::remove_file(to) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                log::warn!("Could not remove partial copy {}: {}", to.display(), cleanup);
            }
        }
        return Err(e);
    }
    fs::remove_file(from)
}
