use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use raidlogger::models::{Role, Snapshot, ThreatEntry};
use raidlogger::parser::{format_snapshot_line, load_snapshots};
use raidlogger::raids::{boss_names, filter_to_boss_fights, infer_raid_from_fights};
use raidlogger::render::{build_threat_report, render_threat_report, ReportMeta};
use raidlogger::segmenter::{split_fights, SegmentParams};
use raidlogger::signals;
use raidlogger::Error;

const COMBAT_LOG: &str = "\
3/14 19:58:01.000  ZONE_INFO: 19:58:01&Molten Core&0
3/14 19:58:02.000  COMBATANT_INFO: 19:58:02&Tanky&WARRIOR&Human&2&0&Dark Sun&Officer&1&nil
3/14 19:58:02.000  COMBATANT_INFO: 19:58:02&Stabby&ROGUE&Human&2&0&Dark Sun&Raider&1&nil
3/14 19:58:02.000  COMBATANT_INFO: 19:58:02&Healbot&PRIEST&Human&2&0&Knights Hospitaller&Raider&1&nil
3/14 20:00:00.000  Tanky casts Taunt on Lucifron.
3/14 20:00:10.000  Tanky casts Taunt on Lucifron.
3/14 20:00:20.000  Tanky casts Taunt on Lucifron.
";

fn snapshot(target: &str, time: f64, elapsed: f64) -> Snapshot {
    let entry = |unit: &str, tank: bool, rate: f64, pct: f64| ThreatEntry {
        time,
        unit: unit.to_string(),
        is_primary_target: tank,
        threat: rate * elapsed,
        threat_pct: pct,
        melee_range: true,
    };
    Snapshot {
        time,
        sender: "Tanky".to_string(),
        target_guid: format!("0xF130-{target}"),
        target_name: target.to_string(),
        entries: vec![
            entry("Tanky", true, 50.0, 100.0),
            entry("Stabby", false, 25.0, 50.0),
            entry("Randompug", false, 80.0, 90.0),
        ],
    }
}

/// One sample per second for `seconds + 1` seconds
fn fight_lines(target: &str, start: f64, seconds: u32) -> Vec<String> {
    (0..=seconds)
        .map(|i| format_snapshot_line(&snapshot(target, start + i as f64, i as f64)))
        .collect()
}

fn write_part(dir: &Path, name: &str, lines: &[String]) {
    let mut body = String::from("some addon chatter\n");
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn part_files_are_merged_in_sequence_order() {
    let dir = tempfile::tempdir().unwrap();
    let lucifron = fight_lines("Lucifron", 100.0, 30);
    let (early, late) = lucifron.split_at(15);
    write_part(dir.path(), "TWThreatThreatLog_part10.txt", &fight_lines("Garr", 500.0, 30));
    write_part(dir.path(), "TWThreatThreatLog_part2.txt", late);
    write_part(dir.path(), "TWThreatThreatLog_part1.txt.txt", early);
    fs::write(dir.path().join("notes.txt"), "not a part-file").unwrap();

    let load = load_snapshots(dir.path()).unwrap();
    assert_eq!(
        load.source_files,
        vec![
            "TWThreatThreatLog_part1.txt.txt",
            "TWThreatThreatLog_part2.txt",
            "TWThreatThreatLog_part10.txt",
        ]
    );
    assert!(load.skipped.is_empty());
    assert_eq!(load.snapshots.len(), 62);
    assert!(load.snapshots.windows(2).all(|w| w[0].time <= w[1].time));
}

#[test]
fn missing_part_files_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_snapshots(dir.path()).unwrap_err();
    assert!(matches!(err, Error::NoPartFiles(_)));

    let err = load_snapshots(&dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, Error::LogDirUnreadable(_)));
}

#[test]
fn full_threat_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut lines = fight_lines("Lucifron", 100.0, 30);
    lines.extend(fight_lines("Lucifron", 200.0, 30));
    lines.extend(fight_lines("Core Hound", 300.0, 30));
    lines.extend(fight_lines("Garr", 400.0, 5));
    write_part(dir.path(), "TWThreatThreatLog_part1.txt", &lines);
    let combat_log = dir.path().join("WoWCombatLog.txt");
    fs::write(&combat_log, COMBAT_LOG).unwrap();

    let params = SegmentParams::default();
    let load = load_snapshots(dir.path()).unwrap();
    let total = load.snapshots.len();
    let all_fights = split_fights(load.snapshots, &params);
    // Garr has only 6 snapshots and is dropped; the 70 s pause splits Lucifron
    assert_eq!(all_fights.len(), 3);

    let raid = infer_raid_from_fights(&all_fights).unwrap();
    assert_eq!(raid, "Molten Core");
    let fights = filter_to_boss_fights(all_fights, boss_names(raid));
    assert_eq!(fights.len(), 2);

    let players = signals::guild_members(&combat_log, &["Dark Sun".to_string()]);
    assert_eq!(players.len(), 2);
    let role_signals = signals::role_signals(&combat_log, &players);
    assert_eq!(role_signals["Tanky"].taunts, 3);

    let meta = ReportMeta {
        raid_name: raid.to_string(),
        target_guilds: vec!["Dark Sun".to_string()],
        source_files: load.source_files,
        skipped_files: load.skipped,
        params,
        total_snapshots: total,
    };
    let report = build_threat_report(&fights, &players, &role_signals, meta);

    assert_eq!(report.fights.len(), 2);
    let first = &report.fights[0];
    assert_eq!(first.target_name, "Lucifron");
    assert_eq!(first.snapshot_count, 31);
    assert_relative_eq!(first.duration_secs, 30.0);
    assert_eq!(first.units.len(), 2);
    assert_eq!(first.units[0].unit, "Tanky");
    assert_relative_eq!(first.units[0].stats.threat_per_second, 50.0);
    assert_relative_eq!(first.units[1].stats.threat_per_second, 25.0);

    let summary: HashMap<&str, _> = report.raid_summary.iter().map(|r| (r.unit.as_str(), r)).collect();
    assert_eq!(summary["Tanky"].role, Role::Tank);
    assert_eq!(summary["Stabby"].role, Role::Dps);
    assert_eq!(summary["Stabby"].fights, 2);
    assert_relative_eq!(summary["Stabby"].threat_gained, 1500.0);

    let html = render_threat_report(&report);
    assert!(html.contains("Molten Core"));
    assert!(html.contains("1,500.0"));
    assert!(!html.contains("Randompug"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["fights"].as_array().unwrap().len(), 2);
    assert_eq!(json["raid_summary"][0]["role"], "tank");
}

#[test]
fn short_sessions_render_a_no_data_report() {
    let dir = tempfile::tempdir().unwrap();
    // three snapshots spread over five seconds
    let lines: Vec<String> = (0..3)
        .map(|i| format_snapshot_line(&snapshot("Ragnaros", 10.0 + 2.5 * i as f64, 2.5 * i as f64)))
        .collect();
    write_part(dir.path(), "TWThreatThreatLog_part1.txt", &lines);

    let load = load_snapshots(dir.path()).unwrap();
    let fights = split_fights(load.snapshots, &SegmentParams::default());
    assert!(fights.is_empty());

    let players = signals::guild_members(&dir.path().join("missing.txt"), &["Dark Sun".to_string()]);
    assert!(players.is_empty());
    let report = build_threat_report(&fights, &players, &HashMap::new(), ReportMeta::default());
    assert!(render_threat_report(&report).contains("No data"));
}

#[cfg(unix)]
#[test]
fn dangling_part_file_is_skipped_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_part(dir.path(), "TWThreatThreatLog_part1.txt", &fight_lines("Lucifron", 100.0, 30));
    std::os::unix::fs::symlink(
        dir.path().join("moved-away.txt"),
        dir.path().join("TWThreatThreatLog_part2.txt"),
    )
    .unwrap();

    let load = load_snapshots(dir.path()).unwrap();
    assert_eq!(
        load.source_files,
        vec!["TWThreatThreatLog_part1.txt", "TWThreatThreatLog_part2.txt"]
    );
    assert_eq!(load.snapshots.len(), 31);
    assert_eq!(load.skipped.len(), 1);
    assert_eq!(load.skipped[0].filename, "TWThreatThreatLog_part2.txt");
    assert!(!load.skipped[0].reason.is_empty());

    let fights = split_fights(load.snapshots, &SegmentParams::default());
    let meta = ReportMeta {
        source_files: load.source_files,
        skipped_files: load.skipped,
        ..ReportMeta::default()
    };
    let report = build_threat_report(&fights, &HashSet::new(), &HashMap::new(), meta);
    let html = render_threat_report(&report);
    assert!(html.contains("Skipped files: TWThreatThreatLog_part2.txt ("));
}

#[test]
fn equal_timestamps_keep_file_then_line_order() {
    let dir = tempfile::tempdir().unwrap();
    let at = |target: &str, time: f64, sender: &str| {
        let mut s = snapshot(target, time, 1.0);
        s.sender = sender.to_string();
        format_snapshot_line(&s)
    };
    write_part(
        dir.path(),
        "TWThreatThreatLog_part1.txt",
        &[at("Lucifron", 50.0, "Tanky"), at("Gehennas", 50.0, "Tanky")],
    );
    write_part(
        dir.path(),
        "TWThreatThreatLog_part2.txt",
        &[at("Garr", 40.0, "Healbot"), at("Lucifron", 50.0, "Healbot")],
    );

    let load = load_snapshots(dir.path()).unwrap();
    let order: Vec<(f64, &str, &str)> = load
        .snapshots
        .iter()
        .map(|s| (s.time, s.target_name.as_str(), s.sender.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            (40.0, "Garr", "Healbot"),
            (50.0, "Lucifron", "Tanky"),
            (50.0, "Gehennas", "Tanky"),
            (50.0, "Lucifron", "Healbot"),
        ]
    );
}
