use std::path::{Path, PathBuf};

use nom::{
    bytes::complete::take_till,
    character::complete::{char, space0},
    combinator::all_consuming,
    number::complete::double,
    sequence::{delimited, terminated, tuple},
    IResult,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::logfile;
use crate::models::*;

/// First tab field of every TWThreat snapshot line
pub const LINE_MARKER: &str = "TWT_THREAT";
/// Prefix of the packet field carrying the per-unit sub-records
pub const PACKET_PREFIX: &str = "TWTv4=";
/// File name prefix of the TWThreat part-files
pub const PART_FILE_PREFIX: &str = "TWThreatThreatLog";

static PART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)_part(\d+)\.txt(?:\.txt)?$").expect("part-file pattern"));

/// Result of loading every part-file of a session
#[derive(Debug, Default)]
pub struct SnapshotLoad {
    /// All parsed snapshots, stable-sorted by time
    pub snapshots: Vec<Snapshot>,
    /// Part-file names in sequence order
    pub source_files: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// Parse one log line into a snapshot.
///
/// Returns `None` for anything that is not a usable snapshot line; log files
/// interleave many other line types so this is the common case.
pub fn parse_snapshot(line: &str) -> Option<Snapshot> {
    let cols: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if cols.len() < 6 || cols[0] != LINE_MARKER {
        return None;
    }

    let time: f64 = cols[1].trim().parse().ok()?;
    let payload = cols[5].strip_prefix(PACKET_PREFIX)?;

    let entries: Vec<ThreatEntry> = payload
        .split(';')
        .filter_map(|chunk| parse_entry(chunk.trim(), time))
        .collect();
    if entries.is_empty() {
        return None;
    }

    Some(Snapshot {
        time,
        sender: cols[2].to_string(),
        target_guid: non_empty_or(cols[3], UNKNOWN_TARGET_GUID),
        target_name: non_empty_or(cols[4], UNKNOWN_TARGET_NAME),
        entries,
    })
}

/// Parse a `unit:tank:threat:pct:melee` sub-record; `None` skips just this unit
pub fn parse_entry(raw: &str, time: f64) -> Option<ThreatEntry> {
    let (_, (unit, tank, threat, threat_pct, melee)) = sub_record(raw).ok()?;
    let unit = unit.trim();
    if unit.is_empty() || !tank.is_finite() || !melee.is_finite() {
        return None;
    }

    Some(ThreatEntry {
        time,
        unit: unit.to_string(),
        is_primary_target: tank.trunc() == 1.0,
        threat,
        threat_pct,
        melee_range: melee.trunc() != 0.0,
    })
}

fn number(input: &str) -> IResult<&str, f64> {
    delimited(space0, double, space0)(input)
}

fn sub_record(input: &str) -> IResult<&str, (&str, f64, f64, f64, f64)> {
    all_consuming(tuple((
        terminated(take_till(|c| c == ':'), char(':')),
        terminated(number, char(':')),
        terminated(number, char(':')),
        terminated(number, char(':')),
        number,
    )))(input)
}

/// Packet field for a list of entries, the inverse of the sub-record grammar
pub fn encode_packet(entries: &[ThreatEntry]) -> String {
    let records: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
    format!("{}{}", PACKET_PREFIX, records.join(";"))
}

/// Full tab-separated log line for a snapshot
pub fn format_snapshot_line(snapshot: &Snapshot) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        LINE_MARKER,
        snapshot.time,
        snapshot.sender,
        snapshot.target_guid,
        snapshot.target_name,
        encode_packet(&snapshot.entries)
    )
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Whether a file name looks like `TWThreatThreatLog*_part*.txt*`
pub fn is_part_file(name: &str) -> bool {
    name.strip_prefix(PART_FILE_PREFIX)
        .and_then(|rest| rest.find("_part").map(|i| &rest[i + "_part".len()..]))
        .is_some_and(|rest| rest.contains(".txt"))
}

/// Ordering key of a part-file: its sequence number (0 when absent), then name
pub fn part_sort_key(name: &str) -> (u64, String) {
    let index = PART_RE
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    (index, name.to_string())
}

/// List the part-files of `log_dir` in sequence order
pub fn list_part_files(log_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(log_dir).map_err(|_| Error::LogDirUnreadable(log_dir.to_path_buf()))?;

    let mut files: Vec<(u64, String, PathBuf)> = entries
        .flatten()
        .map(|entry| entry.path())
        // dangling links stay in so the failed open is recorded as skipped
        .filter(|path| !path.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            if !is_part_file(&name) {
                return None;
            }
            let (index, name) = part_sort_key(&name);
            Some((index, name, path))
        })
        .collect();

    files.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    Ok(files.into_iter().map(|(_, _, path)| path).collect())
}

/// Load and merge every part-file of a session.
///
/// Unreadable files are skipped and recorded; the load only fails when the
/// directory itself is unusable or holds no part-files at all.
pub fn load_snapshots(log_dir: &Path) -> Result<SnapshotLoad> {
    let files = list_part_files(log_dir)?;
    if files.is_empty() {
        return Err(Error::NoPartFiles(log_dir.to_path_buf()));
    }

    let mut load = SnapshotLoad::default();
    for path in &files {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let before = load.snapshots.len();
        let snapshots = &mut load.snapshots;
        let result = logfile::for_each_line(path, |line| {
            if let Some(snapshot) = parse_snapshot(line) {
                snapshots.push(snapshot);
            }
        });

        match result {
            Ok(()) => debug!(
                file = %filename,
                snapshots = load.snapshots.len() - before,
                "parsed part-file"
            ),
            Err(err) => {
                warn!(file = %filename, error = %err, "skipping unreadable part-file");
                load.skipped.push(SkippedFile {
                    filename: filename.clone(),
                    reason: err.to_string(),
                });
            }
        }
        load.source_files.push(filename);
    }

    // stable: equal timestamps keep file/line order
    load.snapshots.sort_by(|a, b| a.time.total_cmp(&b.time));

    info!(
        files = load.source_files.len(),
        skipped = load.skipped.len(),
        snapshots = load.snapshots.len(),
        "loaded threat snapshots"
    );
    Ok(load)
}
