use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Fight, Snapshot};

/// Thresholds controlling how snapshots become fights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentParams {
    /// A pause longer than this (strictly) between two snapshots of the same
    /// target starts a new fight
    pub gap_seconds: f64,
    pub min_duration: f64,
    pub min_snapshots: usize,
}

impl Default for SegmentParams {
    fn default() -> Self {
        SegmentParams {
            gap_seconds: 30.0,
            min_duration: 10.0,
            min_snapshots: 25,
        }
    }
}

impl SegmentParams {
    fn keeps(&self, fight: &Fight) -> bool {
        fight.duration() >= self.min_duration && fight.snapshots.len() >= self.min_snapshots
    }
}

/// Split a session's snapshots into fights.
///
/// Snapshots are grouped per `(target_guid, target_name)`, each group is cut
/// wherever consecutive snapshots are more than `gap_seconds` apart, short or
/// sparse fights are dropped, and the survivors are ordered by start time.
pub fn split_fights(snapshots: Vec<Snapshot>, params: &SegmentParams) -> Vec<Fight> {
    // key -> index into `groups`, keeps first-appearance order of targets
    let mut group_index: HashMap<(String, String), usize> = HashMap::new();
    let mut groups: Vec<Vec<Snapshot>> = Vec::new();

    for snap in snapshots {
        let key = (snap.target_guid.clone(), snap.target_name.clone());
        let idx = *group_index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[idx].push(snap);
    }

    let mut fights: Vec<Fight> = Vec::new();
    for mut group in groups {
        group.sort_by(|a, b| a.time.total_cmp(&b.time));
        fights.extend(split_group(group, params.gap_seconds));
    }

    let total = fights.len();
    fights.retain(|f| params.keeps(f));
    fights.sort_by(|a, b| a.start().total_cmp(&b.start()));

    debug!(
        candidates = total,
        kept = fights.len(),
        gap_seconds = params.gap_seconds,
        "segmented fights"
    );
    fights
}

/// Cut one target's time-ordered snapshots at every gap above the threshold
fn split_group(group: Vec<Snapshot>, gap_seconds: f64) -> Vec<Fight> {
    let mut fights = Vec::new();
    let mut current: Option<Fight> = None;
    let mut last_time: Option<f64> = None;

    for snap in group {
        let gap_exceeded = last_time.is_some_and(|last| snap.time - last > gap_seconds);
        if gap_exceeded {
            fights.extend(current.take());
        }
        last_time = Some(snap.time);

        current
            .get_or_insert_with(|| Fight::new(snap.target_guid.clone(), snap.target_name.clone()))
            .snapshots
            .push(snap);
    }
    fights.extend(current);
    fights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThreatEntry;

    fn snap(time: f64, guid: &str, name: &str) -> Snapshot {
        Snapshot {
            time,
            sender: "Tanky".to_string(),
            target_guid: guid.to_string(),
            target_name: name.to_string(),
            entries: vec![ThreatEntry {
                time,
                unit: "Tanky".to_string(),
                is_primary_target: true,
                threat: time * 10.0,
                threat_pct: 100.0,
                melee_range: true,
            }],
        }
    }

    fn keep_everything(gap_seconds: f64) -> SegmentParams {
        SegmentParams {
            gap_seconds,
            min_duration: 0.0,
            min_snapshots: 1,
        }
    }

    #[test]
    fn short_gap_stays_in_one_fight() {
        let fights = split_fights(
            vec![snap(0.0, "g1", "Ragnaros"), snap(10.0, "g1", "Ragnaros")],
            &keep_everything(30.0),
        );
        assert_eq!(fights.len(), 1);
        assert_eq!(fights[0].duration(), 10.0);
    }

    #[test]
    fn long_gap_splits_the_fight() {
        let fights = split_fights(
            vec![snap(0.0, "g1", "Ragnaros"), snap(40.0, "g1", "Ragnaros")],
            &keep_everything(30.0),
        );
        assert_eq!(fights.len(), 2);
        assert_eq!(fights[0].start(), 0.0);
        assert_eq!(fights[1].start(), 40.0);
    }

    #[test]
    fn gap_equal_to_threshold_does_not_split() {
        let fights = split_fights(
            vec![snap(0.0, "g1", "Ragnaros"), snap(30.0, "g1", "Ragnaros")],
            &keep_everything(30.0),
        );
        assert_eq!(fights.len(), 1);
    }

    #[test]
    fn different_targets_never_merge() {
        let snaps = vec![
            snap(0.0, "g1", "Ragnaros"),
            snap(1.0, "g2", "Son of Flame"),
            snap(2.0, "g1", "Ragnaros"),
            snap(3.0, "g2", "Son of Flame"),
            snap(4.0, "g1", "Son of Flame"),
        ];
        let fights = split_fights(snaps, &keep_everything(30.0));
        assert_eq!(fights.len(), 3);
        for fight in &fights {
            assert!(fight
                .snapshots
                .iter()
                .all(|s| s.target_guid == fight.target_guid && s.target_name == fight.target_name));
        }
        let sizes: Vec<usize> = fights.iter().map(|f| f.snapshots.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn sparse_fight_is_discarded() {
        let snaps = vec![
            snap(0.0, "g1", "Onyxia"),
            snap(2.5, "g1", "Onyxia"),
            snap(5.0, "g1", "Onyxia"),
        ];
        let params = SegmentParams {
            gap_seconds: 30.0,
            min_duration: 0.0,
            min_snapshots: 25,
        };
        assert!(split_fights(snaps, &params).is_empty());
    }

    #[test]
    fn single_snapshot_survives_only_with_zero_minimums() {
        let fights = split_fights(vec![snap(7.0, "g1", "Onyxia")], &keep_everything(30.0));
        assert_eq!(fights.len(), 1);
        assert_eq!(fights[0].duration(), 0.0);

        let params = SegmentParams {
            min_duration: 0.1,
            ..keep_everything(30.0)
        };
        assert!(split_fights(vec![snap(7.0, "g1", "Onyxia")], &params).is_empty());
    }

    #[test]
    fn fights_are_ordered_by_start_across_targets() {
        let snaps = vec![
            snap(50.0, "g2", "Garr"),
            snap(55.0, "g2", "Garr"),
            snap(0.0, "g1", "Lucifron"),
            snap(5.0, "g1", "Lucifron"),
            snap(100.0, "g1", "Lucifron"),
        ];
        let fights = split_fights(snaps, &keep_everything(30.0));
        let starts: Vec<f64> = fights.iter().map(|f| f.start()).collect();
        assert_eq!(starts, vec![0.0, 50.0, 100.0]);
    }
}
