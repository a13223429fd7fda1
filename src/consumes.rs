//! Consumable-cost leaderboard from a `name,copper,deaths` export.

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::logfile;
use crate::models::{ConsumeRow, SunderCount};

/// Lines of the input used to guess the delimiter
const SNIFF_LINES: usize = 50;
/// Delimiters in the order they are preferred when several fit
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

static NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").expect("number pattern"));

/// First integer in a loosely formatted cell (`"1,337g"` -> 1337), 0 when none
pub fn to_int_any(cell: &str) -> i64 {
    let cleaned = cell.trim().replace(',', "");
    NUM_RE
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Guess the field delimiter of a delimited text sample.
///
/// A candidate fits when every non-empty line contains it the same, nonzero
/// number of times. Without a fitting candidate, `;` wins if it is more
/// frequent than `,`.
pub fn sniff_delimiter(sample: &str) -> u8 {
    let lines: Vec<&str> = sample
        .lines()
        .take(SNIFF_LINES)
        .filter(|l| !l.trim().is_empty())
        .collect();

    if !lines.is_empty() {
        let consistent = CANDIDATE_DELIMITERS.iter().copied().find(|&delim| {
            let first = count_byte(lines[0], delim);
            first > 0 && lines.iter().all(|l| count_byte(l, delim) == first)
        });
        if let Some(delim) = consistent {
            return delim;
        }
    }

    if count_byte(sample, b';') > count_byte(sample, b',') {
        b';'
    } else {
        b','
    }
}

fn count_byte(text: &str, byte: u8) -> usize {
    text.bytes().filter(|&b| b == byte).count()
}

fn is_header(row: &csv::StringRecord) -> bool {
    let first = row.get(0).unwrap_or("").trim().to_lowercase();
    let second = row.get(1).unwrap_or("").trim().to_lowercase();
    let cost_column = matches!(second.as_str(), "copper" | "cost" | "total" | "total_cost");
    let name_column = matches!(first.as_str(), "name" | "player" | "character");
    (to_int_any(&second) == 0 && cost_column) || (name_column && matches!(second.as_str(), "copper" | "cost"))
}

/// Parse the export; rows are returned sorted by copper, highest first.
///
/// Rows with fewer than two fields or without a name are skipped, as is a
/// leading header row.
pub fn parse_rows(text: &str, delimiter: u8) -> Result<Vec<ConsumeRow>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut first = true;
    for record in reader.records() {
        let record = record?;
        if record.len() < 2 {
            continue;
        }
        if std::mem::take(&mut first) && is_header(&record) {
            continue;
        }

        let name = record.get(0).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        rows.push(ConsumeRow {
            name: name.to_string(),
            copper: to_int_any(record.get(1).unwrap_or("")),
            deaths: record.get(2).map(to_int_any).unwrap_or(0),
        });
    }

    sort_rows(&mut rows);
    Ok(rows)
}

pub fn sort_rows(rows: &mut [ConsumeRow]) {
    rows.sort_by(|a, b| b.copper.cmp(&a.copper));
}

/// Read and parse an export file, sniffing its delimiter
pub fn load_rows(path: &Path) -> Result<(Vec<ConsumeRow>, u8)> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|e| Error::read(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let sample: String = text.lines().take(SNIFF_LINES).collect::<Vec<_>>().join("\n");
    let delimiter = sniff_delimiter(&sample);
    Ok((parse_rows(&text, delimiter)?, delimiter))
}

/// Side information from the combat log used to clean up the leaderboard
#[derive(Debug, Default, Clone)]
pub struct RosterFilter {
    /// Guild members; empty keeps every name
    pub members: HashSet<String>,
    pub pets: HashSet<String>,
    /// Character who wrote the log and their `You die.` count
    pub logger: Option<(String, i64)>,
}

impl RosterFilter {
    /// Drop pets and non-members, credit the logger's own deaths
    pub fn apply(&self, rows: Vec<ConsumeRow>) -> Vec<ConsumeRow> {
        let mut kept: Vec<ConsumeRow> = rows
            .into_iter()
            .filter(|r| !self.pets.contains(&r.name))
            .filter(|r| self.members.is_empty() || self.members.contains(&r.name))
            .collect();

        if let Some((logger, deaths)) = &self.logger {
            for row in kept.iter_mut().filter(|r| &r.name == logger) {
                row.deaths += deaths;
            }
        }
        sort_rows(&mut kept);
        kept
    }
}

/// Sunder Armor counts from the indented block after `Sunder Armor Summary`
pub fn parse_sunder_summary(path: &Path) -> Result<Vec<SunderCount>> {
    let mut counts = Vec::new();
    let mut in_section = false;
    let mut done = false;
    logfile::for_each_line(path, |line| {
        if done {
            return;
        }
        if !in_section {
            in_section = line.contains("Sunder Armor Summary");
            return;
        }
        let starts_indented = line.starts_with(char::is_whitespace);
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || !starts_indented {
            done = true;
            return;
        }
        match parts.as_slice() {
            [name, trash, boss, ..] => counts.push(SunderCount {
                name: name.to_string(),
                trash: to_int_any(trash),
                boss: to_int_any(boss),
            }),
            [name, total] => counts.push(SunderCount {
                name: name.to_string(),
                trash: to_int_any(total),
                boss: 0,
            }),
            _ => {}
        }
    })?;
    Ok(counts)
}

/// `1234567` copper -> `123g 45s 67c`
pub fn copper_to_gsc(copper: i64) -> String {
    let (g, s, c) = split_copper(copper);
    format!("{}g {:02}s {:02}c", g, s, c)
}

/// Like [`copper_to_gsc`] but omits a zero copper part
pub fn copper_to_gsc_short(copper: i64) -> String {
    let (g, s, c) = split_copper(copper);
    if c == 0 {
        format!("{}g {:02}s", g, s)
    } else {
        format!("{}g {:02}s {:02}c", g, s, c)
    }
}

fn split_copper(copper: i64) -> (i64, i64, i64) {
    let gold = copper.div_euclid(10_000);
    let silver = copper.rem_euclid(10_000) / 100;
    let rest = copper.rem_euclid(100);
    (gold, silver, rest)
}
