//! Near-duplicate grouping.
//!
//! Records are assigned in a single pass, in the order they are supplied. A
//! record joins the first existing group whose seed hash is close enough and
//! whose founding member was taken close enough in time; otherwise it founds
//! a new group. The time window is anchored to the founder and never drifts.

use crate::core::extract::PhotoRecord;
use crate::core::hash::distance;
use chrono::{NaiveDateTime, TimeDelta};
use image_hasher::ImageHash;

pub const DEFAULT_MAX_DISTANCE: u32 = 20;
pub const DEFAULT_MAX_TIME_DELTA_SECS: i64 = 3;

/// Joint thresholds for joining a group. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterConfig {
    pub max_distance: u32,
    pub max_time_delta: TimeDelta,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_MAX_DISTANCE,
            max_time_delta: TimeDelta::seconds(DEFAULT_MAX_TIME_DELTA_SECS),
        }
    }
}

/// A cluster of near-duplicate photos. `id` is the cluster identity; seed
/// hashes are not required to be unique across groups.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: usize,
    pub seed_hash: ImageHash,
    pub members: Vec<PhotoRecord>,
}

impl Group {
    fn found(id: usize, record: PhotoRecord) -> Self {
        Self {
            id,
            seed_hash: record.hash.clone(),
            members: vec![record],
        }
    }

    /// The member that opened the group. `None` only for a hand-built empty group.
    pub fn founder(&self) -> Option<&PhotoRecord> {
        self.members.first()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn accepts(&self, record: &PhotoRecord, config: &ClusterConfig) -> bool {
        let Some(founder) = self.founder() else {
            return false;
        };
        distance(&record.hash, &self.seed_hash) <= config.max_distance
            && time_delta(record.time, founder.time) <= config.max_time_delta
    }
}

fn time_delta(a: NaiveDateTime, b: NaiveDateTime) -> TimeDelta {
    if a >= b { a - b } else { b - a }
}

/// Partition `records` into groups, first-fit, preserving input order.
pub fn cluster<I>(records: I, config: &ClusterConfig) -> Vec<Group>
where
    I: IntoIterator<Item = PhotoRecord>,
{
    let mut groups: Vec<Group> = Vec::new();

    for record in records {
        match groups.iter_mut().find(|g| g.accepts(&record, config)) {
            Some(group) => group.members.push(record),
            None => {
                let id = groups.len();
                groups.push(Group::found(id, record));
            }
        }
    }

    log::debug!("Clustered into {} group(s)", groups.len());
    groups
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    pub(crate) fn hash_from_bits(bits: u64) -> ImageHash {
        ImageHash::from_bytes(&bits.to_be_bytes()).unwrap()
    }

    /// A hash exactly `n` bits away from `hash_from_bits(0)`.
    pub(crate) fn hash_at_distance(n: u32) -> ImageHash {
        let bits = if n == 0 { 0 } else { u64::MAX >> (64 - n) };
        hash_from_bits(bits)
    }

    pub(crate) fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    pub(crate) fn record(name: &str, hash: ImageHash, time: NaiveDateTime) -> PhotoRecord {
        PhotoRecord {
            path: PathBuf::from(name),
            hash,
            time,
        }
    }

    fn names(group: &Group) -> Vec<String> {
        group.members.iter().map(|r| r.file_name()).collect()
    }

    #[test]
    fn test_hash_helper_distance() {
        assert_eq!(distance(&hash_at_distance(0), &hash_at_distance(20)), 20);
        assert_eq!(distance(&hash_at_distance(0), &hash_at_distance(21)), 21);
    }

    #[test]
    fn test_empty_input_gives_no_groups() {
        let groups = cluster(Vec::new(), &ClusterConfig::default());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_identical_hash_and_time_group_together() {
        let t = at(10, 0, 0);
        let groups = cluster(
            vec![
                record("a.jpg", hash_at_distance(0), t),
                record("b.jpg", hash_at_distance(0), t),
            ],
            &ClusterConfig::default(),
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(names(&groups[0]), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let t = at(10, 0, 0);
        let groups = cluster(
            vec![
                record("seed.jpg", hash_at_distance(0), t),
                record("edge.jpg", hash_at_distance(20), t + TimeDelta::seconds(3)),
            ],
            &ClusterConfig::default(),
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_distance_21_starts_new_group() {
        let t = at(10, 0, 0);
        let groups = cluster(
            vec![
                record("seed.jpg", hash_at_distance(0), t),
                record("far.jpg", hash_at_distance(21), t),
            ],
            &ClusterConfig::default(),
        );
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_delta_just_over_window_starts_new_group() {
        let t = at(10, 0, 0);
        let groups = cluster(
            vec![
                record("seed.jpg", hash_at_distance(0), t),
                record("late.jpg", hash_at_distance(0), t + TimeDelta::milliseconds(3001)),
                record("early.jpg", hash_at_distance(0), t - TimeDelta::milliseconds(3001)),
            ],
            &ClusterConfig::default(),
        );
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_window_is_anchored_to_founder() {
        let t = at(10, 0, 0);
        let groups = cluster(
            vec![
                record("t0.jpg", hash_at_distance(0), t),
                record("t2.jpg", hash_at_distance(0), t + TimeDelta::seconds(2)),
                record("t4.jpg", hash_at_distance(0), t + TimeDelta::seconds(4)),
                record("t10.jpg", hash_at_distance(0), t + TimeDelta::seconds(10)),
            ],
            &ClusterConfig::default(),
        );
        // t4 is 2s from t2 but 4s from the founder.
        assert_eq!(groups.len(), 3);
        assert_eq!(names(&groups[0]), vec!["t0.jpg", "t2.jpg"]);
        assert_eq!(names(&groups[1]), vec!["t4.jpg"]);
        assert_eq!(names(&groups[2]), vec!["t10.jpg"]);
    }

    #[test]
    fn test_first_fit_prefers_earlier_group() {
        let t = at(12, 0, 0);
        // g1 seed at 0 bits, g2 seed at 30 bits: far apart from each other.
        // The candidate sits 15 bits from both seeds, within both windows.
        let candidate = hash_from_bits((u64::MAX >> 49) << 15);
        assert_eq!(distance(&candidate, &hash_at_distance(0)), 15);
        assert_eq!(distance(&candidate, &hash_at_distance(30)), 15);

        let groups = cluster(
            vec![
                record("g1.jpg", hash_at_distance(0), t),
                record("g2.jpg", hash_at_distance(30), t + TimeDelta::seconds(1)),
                record("candidate.jpg", candidate, t + TimeDelta::seconds(2)),
            ],
            &ClusterConfig::default(),
        );
        assert_eq!(groups.len(), 2);
        assert_eq!(names(&groups[0]), vec!["g1.jpg", "candidate.jpg"]);
        assert_eq!(names(&groups[1]), vec!["g2.jpg"]);
    }

    #[test]
    fn test_input_order_changes_outcome() {
        let t = at(9, 0, 0);
        let a = record("a.jpg", hash_at_distance(0), t);
        let b = record("b.jpg", hash_at_distance(0), t + TimeDelta::seconds(3));
        let c = record("c.jpg", hash_at_distance(0), t + TimeDelta::seconds(6));

        let forward = cluster(vec![a.clone(), b.clone(), c.clone()], &ClusterConfig::default());
        assert_eq!(forward.len(), 2);
        assert_eq!(names(&forward[0]), vec!["a.jpg", "b.jpg"]);

        let middle_first = cluster(vec![b, a, c], &ClusterConfig::default());
        assert_eq!(middle_first.len(), 1);
        assert_eq!(names(&middle_first[0]), vec!["b.jpg", "a.jpg", "c.jpg"]);
    }

    #[test]
    fn test_members_within_thresholds_of_founder() {
        let t = at(15, 30, 0);
        let records: Vec<PhotoRecord> = (0..12u32)
            .map(|i| {
                record(
                    &format!("{i}.jpg"),
                    hash_at_distance((i * 7) % 40),
                    t + TimeDelta::seconds(i64::from(i % 5)),
                )
            })
            .collect();
        let config = ClusterConfig::default();
        let groups = cluster(records, &config);

        let total: usize = groups.iter().map(Group::len).sum();
        assert_eq!(total, 12);
        for group in &groups {
            assert!(!group.is_empty());
            assert_eq!(group.seed_hash, group.founder().unwrap().hash);
            for member in &group.members {
                assert!(distance(&member.hash, &group.seed_hash) <= config.max_distance);
                assert!(time_delta(member.time, group.founder().unwrap().time) <= config.max_time_delta);
            }
        }
    }

    #[test]
    fn test_empty_group_has_no_founder_and_accepts_nothing() {
        let empty = Group {
            id: 0,
            seed_hash: hash_at_distance(0),
            members: Vec::new(),
        };
        assert!(empty.founder().is_none());
        assert!(!empty.accepts(&record("a.jpg", hash_at_distance(0), at(8, 0, 0)), &ClusterConfig::default()));
    }

    #[test]
    fn test_shared_seed_hash_keeps_distinct_ids() {
        let t = at(8, 0, 0);
        let groups = cluster(
            vec![
                record("morning.jpg", hash_at_distance(0), t),
                record("later.jpg", hash_at_distance(0), t + TimeDelta::minutes(5)),
            ],
            &ClusterConfig::default(),
        );
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].seed_hash, groups[1].seed_hash);
        assert_eq!(groups[0].id, 0);
        assert_eq!(groups[1].id, 1);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = at(8, 0, 0);
        let config = ClusterConfig {
            max_distance: 2,
            max_time_delta: TimeDelta::seconds(60),
        };
        let groups = cluster(
            vec![
                record("a.jpg", hash_at_distance(0), t),
                record("b.jpg", hash_at_distance(2), t + TimeDelta::seconds(45)),
                record("c.jpg", hash_at_distance(3), t + TimeDelta::seconds(10)),
            ],
            &config,
        );
        assert_eq!(groups.len(), 2);
        assert_eq!(names(&groups[0]), vec!["a.jpg", "b.jpg"]);
    }
}
