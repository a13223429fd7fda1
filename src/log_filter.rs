//! Cut a combat log down to the lines recorded inside one raid.
//!
//! A single log often spans several raids. Raid membership of a line is
//! decided by the most recent `ZONE_INFO` line before it.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::logfile;
use crate::raids::zone_to_raid;
use crate::signals::zone_name;

/// Raids entered in a combat log, in first-seen order
pub fn detect_raids(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let mut raids: Vec<String> = Vec::new();
    logfile::for_each_line(path, |line| {
        if let Some(raid) = zone_name(line).and_then(zone_to_raid) {
            if !raids.iter().any(|r| r == raid) {
                raids.push(raid.to_string());
            }
        }
    })?;
    Ok(raids)
}

/// Pick the raid to extract.
///
/// A requested name is matched case-insensitively against the detected raids
/// and returned in its canonical spelling. Without a request, a log holding a
/// single raid selects it; several raids need an explicit choice.
pub fn resolve_raid(detected: &[String], requested: Option<&str>) -> Result<String> {
    match requested {
        Some(wanted) => detected
            .iter()
            .find(|raid| raid.eq_ignore_ascii_case(wanted.trim()))
            .cloned()
            .ok_or_else(|| Error::UnknownRaid {
                requested: wanted.to_string(),
                available: detected.to_vec(),
            }),
        None => match detected {
            [only] => Ok(only.clone()),
            _ => Err(Error::AmbiguousRaid(detected.to_vec())),
        },
    }
}

/// Match a typed answer (1-based number or raid name) against the choices
pub fn parse_selection(answer: &str, raids: &[String]) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    if let Ok(idx) = answer.parse::<usize>() {
        if (1..=raids.len()).contains(&idx) {
            return Some(raids[idx - 1].clone());
        }
    }
    raids.iter().find(|r| r.eq_ignore_ascii_case(answer)).cloned()
}

/// Lines of `input` captured while inside `raid`
pub fn raid_lines(input: &Path, raid: &str) -> Result<Vec<String>> {
    let mut kept = Vec::new();
    let mut current: Option<&'static str> = None;
    logfile::for_each_line(input, |line| {
        if let Some(zone) = zone_name(line) {
            current = zone_to_raid(zone);
        }
        if current == Some(raid) {
            kept.push(line.to_string());
        }
    })?;
    Ok(kept)
}

/// Write the lines of `raid` from `input` to `output`; returns the line count.
///
/// Nothing is written when no line matched.
pub fn filter_log_to_raid(input: &Path, output: &Path, raid: &str) -> Result<usize> {
    let lines = raid_lines(input, raid)?;
    if lines.is_empty() {
        return Ok(0);
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;
    }
    let mut body = lines.join("\n");
    body.push('\n');
    fs::write(output, body).map_err(|e| Error::write(output, e))?;

    info!(raid, lines = lines.len(), output = %output.display(), "wrote filtered combat log");
    Ok(lines.len())
}
