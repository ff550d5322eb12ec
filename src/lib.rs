//! Groups near-duplicate photos from a dump folder, keeps the best shot of
//! each group in a dated event tree and moves the rest aside for review.

pub mod core;
pub mod report;

pub use crate::core::cluster::{ClusterConfig, Group, cluster};
pub use crate::core::engine::{Analysis, EmptyReason, ProgressSink, ScanError, ScanProgress, analyze};
pub use crate::core::extract::{ExtractError, PhotoExtractor, PhotoRecord};
pub use crate::core::organize::{OrganizeError, OrganizeOptions, OrganizeReport, Organizer};
pub use crate::core::tagging::{TagError, TagPrompt, TagReport, apply_tags};
