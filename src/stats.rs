//! Per-unit threat statistics for a fight and for a whole raid.
//!
//! Threat gained is measured between the first and the last observation of a
//! unit. This assumes those two samples bound the useful range: a threat
//! wipe, a counter reset, or a unit leaving and rejoining the fight makes the
//! figure under- or over-count. It is a heuristic, not an exact measurement.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Fight, RaidUnitSummary, RoleSignals, UnitFightStats};
use crate::roles::classify_role;

/// Aggregate the permitted units' entries of one fight.
///
/// Entries of units outside `allowed` are ignored.
pub fn build_unit_stats(fight: &Fight, allowed: &HashSet<String>) -> BTreeMap<String, UnitFightStats> {
    let mut per_unit: BTreeMap<String, UnitFightStats> = BTreeMap::new();

    for snap in &fight.snapshots {
        for e in &snap.entries {
            if !allowed.contains(&e.unit) {
                continue;
            }
            let s = per_unit
                .entry(e.unit.clone())
                .or_insert_with(|| UnitFightStats::observe(e));

            if e.time < s.first_time {
                s.first_time = e.time;
                s.first_threat = e.threat;
            }
            if e.time > s.last_time {
                s.last_time = e.time;
                s.last_threat = e.threat;
            }
            // ties at the boundaries: lowest threat opens, highest closes
            if e.time == s.first_time {
                s.first_threat = s.first_threat.min(e.threat);
            }
            if e.time == s.last_time {
                s.last_threat = s.last_threat.max(e.threat);
            }

            s.pct_sum += e.threat_pct;
            s.pct_samples += 1;
            if e.is_primary_target {
                s.primary_samples += 1;
            }
            s.samples += 1;
        }
    }

    for stats in per_unit.values_mut() {
        stats.finish();
    }
    per_unit
}

#[derive(Debug, Default)]
struct RaidAccumulator {
    threat: f64,
    duration: f64,
    fights: u32,
    avg_pcts: Vec<f64>,
    primary_ratios: Vec<f64>,
}

/// Folds per-fight stats into a raid-wide summary
#[derive(Debug, Default)]
pub struct RaidSummaryBuilder {
    units: BTreeMap<String, RaidAccumulator>,
}

impl RaidSummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fight(&mut self, stats: &BTreeMap<String, UnitFightStats>) {
        for (unit, s) in stats {
            let acc = self.units.entry(unit.clone()).or_default();
            acc.threat += s.threat_gained;
            acc.duration += s.duration_active;
            acc.fights += 1;
            acc.avg_pcts.push(s.avg_top_pct);
            acc.primary_ratios.push(s.primary_target_ratio);
        }
    }

    /// Raid summary sorted by total threat, highest first
    pub fn finish(self, signals: &HashMap<String, RoleSignals>) -> Vec<RaidUnitSummary> {
        let mut rows: Vec<RaidUnitSummary> = self
            .units
            .into_iter()
            .map(|(unit, acc)| {
                let threat_per_second = if acc.duration > 0.0 {
                    acc.threat / acc.duration
                } else {
                    0.0
                };
                let avg_top_pct = mean(&acc.avg_pcts);
                let primary_target_ratio = mean(&acc.primary_ratios);
                let unit_signals = signals.get(&unit).copied().unwrap_or_default();
                RaidUnitSummary {
                    role: classify_role(avg_top_pct, primary_target_ratio, &unit_signals),
                    unit,
                    fights: acc.fights,
                    threat_gained: acc.threat,
                    duration_active: acc.duration,
                    threat_per_second,
                    avg_top_pct,
                    primary_target_ratio,
                    signals: unit_signals,
                }
            })
            .collect();

        rows.sort_by(|a, b| b.threat_gained.total_cmp(&a.threat_gained));
        rows
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
