use crate::core::cluster::Group;
use crate::core::organize::{OrganizeError, folder_label, select_representative};
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct MemberReport {
    pub path: String,
    pub time: NaiveDateTime,
}

/// Serializable preview of one group: what would be kept and where.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub id: usize,
    pub seed_hash: String,
    pub folder: String,
    pub best: MemberReport,
    pub duplicates: Vec<MemberReport>,
}

impl GroupReport {
    /// `None` for a group without members; there is nothing to keep.
    pub fn from_group(group: &Group, use_time_slots: bool) -> Result<Option<Self>, OrganizeError> {
        if group.is_empty() {
            return Ok(None);
        }
        let best_index = select_representative(group)?;
        let member = |index: usize| MemberReport {
            path: group.members[index].path.to_string_lossy().to_string(),
            time: group.members[index].time,
        };
        Ok(Some(Self {
            id: group.id,
            seed_hash: group.seed_hash.to_base64(),
            folder: folder_label(group.members[best_index].time, use_time_slots),
            best: member(best_index),
            duplicates: (0..group.members.len())
                .filter(|&i| i != best_index)
                .map(member)
                .collect(),
        }))
    }
}

pub fn plan(groups: &[Group], use_time_slots: bool) -> Result<Vec<GroupReport>, OrganizeError> {
    let mut reports = Vec::with_capacity(groups.len());
    for group in groups {
        if let Some(report) = GroupReport::from_group(group, use_time_slots)? {
            reports.push(report);
        }
    }
    Ok(reports)
}
