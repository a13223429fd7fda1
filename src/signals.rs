//! Extraction of side information from the free-text combat log.
//!
//! Each extractor looks at a single line and returns `None` when the line is
//! not of its kind. The file scanners below combine them; adding a new log
//! format means adding an extractor, not touching fight segmentation.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::path::Path;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::logfile;
use crate::models::RoleSignals;
use crate::raids::zone_to_raid;

pub const TAUNT_ABILITIES: &[&str] = &[
    "Taunt",
    "Growl",
    "Mocking Blow",
    "Challenging Shout",
    "Challenging Roar",
];

pub const TANK_ABILITIES: &[&str] = &[
    "Sunder Armor",
    "Revenge",
    "Shield Slam",
    "Shield Block",
    "Demoralizing Shout",
    "Righteous Fury",
    "Holy Shield",
    "Defensive Stance",
    "Bear Form",
    "Dire Bear Form",
    "Maul",
    "Swipe",
];

/// Substrings marking a cast as a heal
pub const HEALING_SPELL_HINTS: &[&str] = &[
    "Heal",
    "Flash Heal",
    "Greater Heal",
    "Prayer of Healing",
    "Renew",
    "Rejuvenation",
    "Regrowth",
    "Healing Touch",
    "Lesser Healing Wave",
    "Chain Heal",
    "Holy Light",
    "Flash of Light",
    "Swiftmend",
];

static CAST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s([A-Za-z][A-Za-z'\-]+) casts ([^.]+?)(?: on [^.]+)?\.").expect("cast pattern")
});
static GAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s([A-Za-z][A-Za-z'\-]+) gains ([^.]+)\.").expect("gain pattern"));
static HEAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s([A-Za-z][A-Za-z'\-]+)(?:'s [^.]+)? heals ").expect("heal pattern")
});
static PET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+)\s+\([A-Z][a-z]+\)").expect("pet pattern"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})\s+\d{1,2}:\d{2}:\d{2}").expect("timestamp pattern")
});

/// Zone name of a `ZONE_INFO:` line (second `&`-separated field)
pub fn zone_name(line: &str) -> Option<&str> {
    if !line.contains("ZONE_INFO:") {
        return None;
    }
    line.split('&').nth(1).map(str::trim)
}

/// Caster of a "X heals Y" or "X's Spell heals Y" line
pub fn heal_caster(line: &str) -> Option<&str> {
    HEAL_RE.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// `(caster, spell)` of a "X casts Spell [on Y]." line
pub fn spell_cast(line: &str) -> Option<(&str, &str)> {
    let caps = CAST_RE.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str().trim()))
}

/// `(unit, aura)` of a "X gains Aura." line
pub fn aura_gain(line: &str) -> Option<(&str, &str)> {
    let caps = GAIN_RE.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str().trim()))
}

/// Pet names written as `Name (Owner)`
pub fn pet_names(line: &str) -> impl Iterator<Item = &str> {
    PET_RE
        .captures_iter(line)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn is_logger_death(line: &str) -> bool {
    line.contains("You die.")
}

/// Leading `MM/DD` of a timestamped line
pub fn line_month_day(line: &str) -> Option<(u32, u32)> {
    let caps = DATE_RE.captures(line)?;
    let month = caps.get(1)?.as_str().parse().ok()?;
    let day = caps.get(2)?.as_str().parse().ok()?;
    Some((month, day))
}

/// Matches `COMBATANT_INFO:` lines of characters in a fixed set of guilds
#[derive(Debug, Clone)]
pub struct GuildMatcher {
    pattern: Regex,
}

impl GuildMatcher {
    /// `None` when no guilds are configured
    pub fn new(guilds: &[String]) -> Option<Self> {
        let alternatives: Vec<String> = guilds
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return None;
        }
        let pattern = format!(
            r"COMBATANT_INFO:.*?&([^&]+)&[A-Z]+&[A-Za-z]+&\d+&[^&]*&({})&",
            alternatives.join("|")
        );
        Regex::new(&pattern).ok().map(|pattern| GuildMatcher { pattern })
    }

    /// Character name if the line announces a member of a configured guild
    pub fn member<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
    }
}

/// Fold one line into the role counters of known players
pub fn record_role_signals(line: &str, signals: &mut HashMap<String, RoleSignals>) {
    if let Some(caster) = heal_caster(line) {
        if let Some(sig) = signals.get_mut(caster) {
            sig.heals += 1;
        }
    }

    if let Some((caster, spell)) = spell_cast(line) {
        if let Some(sig) = signals.get_mut(caster) {
            if TAUNT_ABILITIES.contains(&spell) {
                sig.taunts += 1;
            }
            if TANK_ABILITIES.contains(&spell) {
                sig.tank_abilities += 1;
            }
            if HEALING_SPELL_HINTS.iter().any(|hint| spell.contains(hint)) {
                sig.heals += 1;
            }
        }
    }

    if let Some((unit, aura)) = aura_gain(line) {
        if let Some(sig) = signals.get_mut(unit) {
            if TANK_ABILITIES.contains(&aura) {
                sig.tank_abilities += 1;
            }
        }
    }
}

/// Run `visit` over an optional input until it breaks; a missing or
/// unreadable file is only a warning
pub(crate) fn scan_optional<F>(path: &Path, what: &str, visit: F)
where
    F: FnMut(&str) -> ControlFlow<()>,
{
    if !path.exists() {
        warn!(path = %path.display(), "combat log not found, skipping {what}");
        return;
    }
    if let Err(err) = logfile::scan_lines(path, visit) {
        warn!(error = %err, "combat log only partially read for {what}");
    }
}

/// Characters of the given guilds seen in `COMBATANT_INFO` lines
pub fn guild_members(path: &Path, guilds: &[String]) -> HashSet<String> {
    let mut members = HashSet::new();
    let Some(matcher) = GuildMatcher::new(guilds) else {
        return members;
    };
    scan_optional(path, "guild detection", |line| {
        if let Some(name) = matcher.member(line) {
            members.insert(name.to_string());
        }
        ControlFlow::Continue(())
    });
    debug!(members = members.len(), "guild members found");
    members
}

/// Heal, taunt, and tank-ability counters for each of `players`
pub fn role_signals(path: &Path, players: &HashSet<String>) -> HashMap<String, RoleSignals> {
    let mut signals: HashMap<String, RoleSignals> = players
        .iter()
        .map(|p| (p.clone(), RoleSignals::default()))
        .collect();
    if players.is_empty() {
        return signals;
    }
    scan_optional(path, "role signals", |line| {
        record_role_signals(line, &mut signals);
        ControlFlow::Continue(())
    });
    signals
}

pub fn pets(path: &Path) -> HashSet<String> {
    let mut pets = HashSet::new();
    scan_optional(path, "pet detection", |line| {
        pets.extend(pet_names(line).map(str::to_string));
        ControlFlow::Continue(())
    });
    pets
}

/// Number of `You die.` lines, i.e. deaths of the character who wrote the log
pub fn logger_deaths(path: &Path) -> u32 {
    let mut deaths = 0;
    scan_optional(path, "death counting", |line| {
        if is_logger_death(line) {
            deaths += 1;
        }
        ControlFlow::Continue(())
    });
    deaths
}

/// Calendar date of a timestamped line; `None` for impossible days like `2/30`
pub fn line_date(line: &str, year: i32) -> Option<NaiveDate> {
    let (month, day) = line_month_day(line)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Date of the first line with a valid timestamp; the log carries no year so
/// it is supplied
pub fn raid_date(path: &Path, year: i32) -> Option<NaiveDate> {
    let mut found = None;
    scan_optional(path, "raid date", |line| {
        found = line_date(line, year);
        if found.is_some() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    found
}

/// Everything the consumable report takes from a combat log
#[derive(Debug, Default, Clone)]
pub struct CombatLogScan {
    pub members: HashSet<String>,
    pub pets: HashSet<String>,
    pub logger_deaths: u32,
    /// First raid zone entered
    pub raid: Option<&'static str>,
    pub date: Option<NaiveDate>,
}

impl CombatLogScan {
    /// Fold one line into the scan
    pub fn observe(&mut self, line: &str, guilds: Option<&GuildMatcher>, year: i32) {
        if let Some(name) = guilds.and_then(|m| m.member(line)) {
            self.members.insert(name.to_string());
        }
        self.pets.extend(pet_names(line).map(str::to_string));
        if is_logger_death(line) {
            self.logger_deaths += 1;
        }
        if self.raid.is_none() {
            self.raid = zone_name(line).and_then(zone_to_raid);
        }
        if self.date.is_none() {
            self.date = line_date(line, year);
        }
    }
}

/// Guild members, pets, logger deaths, raid and date in a single read
pub fn scan_combat_log(path: &Path, guilds: &[String], year: i32) -> CombatLogScan {
    let matcher = GuildMatcher::new(guilds);
    let mut scan = CombatLogScan::default();
    scan_optional(path, "combat log scan", |line| {
        scan.observe(line, matcher.as_ref(), year);
        ControlFlow::Continue(())
    });
    debug!(
        members = scan.members.len(),
        pets = scan.pets.len(),
        deaths = scan.logger_deaths,
        "scanned combat log"
    );
    scan
}
