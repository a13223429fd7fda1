use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Placeholder GUID for snapshots that did not name their target
pub const UNKNOWN_TARGET_GUID: &str = "UNKNOWN_GUID";
/// Placeholder name for snapshots that did not name their target
pub const UNKNOWN_TARGET_NAME: &str = "Unknown Target";

/// One unit's threat reading at one instant
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ThreatEntry {
    pub time: f64,
    pub unit: String,
    /// Unit currently holds aggro on the snapshot target
    pub is_primary_target: bool,
    /// Cumulative threat against the target
    pub threat: f64,
    /// Threat relative to the top holder, 0-100
    pub threat_pct: f64,
    pub melee_range: bool,
}

impl fmt::Display for ThreatEntry {
    /// Wire form of a packet sub-record: `unit:tank:threat:pct:melee`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.unit,
            u8::from(self.is_primary_target),
            self.threat,
            self.threat_pct,
            u8::from(self.melee_range)
        )
    }
}

/// One TWThreat capture: every unit's standing against one target
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Snapshot {
    pub time: f64,
    /// Player whose addon reported the packet
    pub sender: String,
    pub target_guid: String,
    pub target_name: String,
    pub entries: Vec<ThreatEntry>,
}

/// A contiguous encounter against one target
#[derive(Debug, Serialize, Clone)]
pub struct Fight {
    pub target_guid: String,
    pub target_name: String,
    pub snapshots: Vec<Snapshot>,
}

impl Fight {
    pub fn new(target_guid: String, target_name: String) -> Self {
        Fight {
            target_guid,
            target_name,
            snapshots: Vec::new(),
        }
    }

    pub fn start(&self) -> f64 {
        self.snapshots.first().map(|s| s.time).unwrap_or(0.0)
    }

    pub fn end(&self) -> f64 {
        self.snapshots.last().map(|s| s.time).unwrap_or(0.0)
    }

    pub fn duration(&self) -> f64 {
        (self.end() - self.start()).max(0.0)
    }
}

/// Per-unit threat metrics within one fight.
///
/// The raw observation fields are filled during the scan; the derived
/// fields are computed once by [`UnitFightStats::finish`].
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct UnitFightStats {
    pub first_time: f64,
    pub first_threat: f64,
    pub last_time: f64,
    pub last_threat: f64,
    pub pct_sum: f64,
    pub pct_samples: u32,
    pub primary_samples: u32,
    pub samples: u32,

    pub duration_active: f64,
    pub threat_gained: f64,
    pub threat_per_second: f64,
    pub avg_top_pct: f64,
    pub primary_target_ratio: f64,
}

impl UnitFightStats {
    pub(crate) fn observe(entry: &ThreatEntry) -> Self {
        UnitFightStats {
            first_time: entry.time,
            first_threat: entry.threat,
            last_time: entry.time,
            last_threat: entry.threat,
            pct_sum: 0.0,
            pct_samples: 0,
            primary_samples: 0,
            samples: 0,
            duration_active: 0.0,
            threat_gained: 0.0,
            threat_per_second: 0.0,
            avg_top_pct: 0.0,
            primary_target_ratio: 0.0,
        }
    }

    pub(crate) fn finish(&mut self) {
        self.duration_active = (self.last_time - self.first_time).max(0.0);
        self.threat_gained = (self.last_threat - self.first_threat).max(0.0);
        self.threat_per_second = if self.duration_active > 0.0 {
            self.threat_gained / self.duration_active
        } else {
            0.0
        };
        self.avg_top_pct = if self.pct_samples > 0 {
            self.pct_sum / self.pct_samples as f64
        } else {
            0.0
        };
        self.primary_target_ratio = if self.samples > 0 {
            self.primary_samples as f64 / self.samples as f64
        } else {
            0.0
        };
    }
}

/// Per-player counters scraped from the free-text combat log
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSignals {
    pub heals: u32,
    pub taunts: u32,
    pub tank_abilities: u32,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tank,
    Healer,
    Dps,
}

impl Role {
    /// CSS class used by the report badges
    pub fn css_class(self) -> &'static str {
        match self {
            Role::Tank => "tank",
            Role::Healer => "healer",
            Role::Dps => "dps",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Tank => "Tank",
            Role::Healer => "Healer",
            Role::Dps => "DPS",
        }
    }
}

/// Raid-wide roll-up of one unit's fights
#[derive(Debug, Serialize, Clone)]
pub struct RaidUnitSummary {
    pub unit: String,
    pub role: Role,
    pub fights: u32,
    pub threat_gained: f64,
    pub duration_active: f64,
    /// Summed threat over summed active time
    pub threat_per_second: f64,
    /// Unweighted mean of the per-fight averages
    pub avg_top_pct: f64,
    pub primary_target_ratio: f64,
    pub signals: RoleSignals,
}

/// A labeled row of a per-fight table
#[derive(Debug, Serialize, Clone)]
pub struct UnitRow {
    pub unit: String,
    pub role: Role,
    pub stats: UnitFightStats,
}

#[derive(Debug, Serialize, Clone)]
pub struct FightReport {
    pub index: usize,
    pub target_guid: String,
    pub target_name: String,
    pub start: f64,
    pub duration_secs: f64,
    pub snapshot_count: usize,
    pub units: Vec<UnitRow>,
}

/// A part-file that could not be read
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// Everything the threat report shows, independent of its HTML layout
#[derive(Debug, Serialize, Clone)]
pub struct ThreatReport {
    pub raid_name: String,
    pub target_guilds: Vec<String>,
    pub source_files: Vec<String>,
    pub skipped_files: Vec<SkippedFile>,
    pub gap_seconds: f64,
    pub min_duration: f64,
    pub min_snapshots: usize,
    pub total_snapshots: usize,
    pub players_seen: usize,
    pub fights: Vec<FightReport>,
    pub raid_summary: Vec<RaidUnitSummary>,
}

impl ThreatReport {
    /// Distinct target names across the reported fights
    pub fn boss_target_count(&self) -> usize {
        let mut names: Vec<&str> = self.fights.iter().map(|f| f.target_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }

    pub fn fight_snapshot_total(&self) -> usize {
        self.fights.iter().map(|f| f.snapshot_count).sum()
    }
}

/// One row of the consumable-cost CSV export
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ConsumeRow {
    pub name: String,
    pub copper: i64,
    pub deaths: i64,
}

/// Sunder Armor counts from a summary file
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SunderCount {
    pub name: String,
    pub trash: i64,
    pub boss: i64,
}

impl SunderCount {
    pub fn total(&self) -> i64 {
        self.trash + self.boss
    }
}

/// Everything the consumable report shows
#[derive(Debug, Serialize, Clone, Default)]
pub struct ConsumeReport {
    /// File name of the CSV export
    pub source_name: String,
    pub delimiter: char,
    /// Sorted by copper, highest first
    pub rows: Vec<ConsumeRow>,
    pub raid_name: Option<String>,
    pub raid_date: Option<NaiveDate>,
    pub sunders: Vec<SunderCount>,
}

impl ConsumeReport {
    pub fn total_copper(&self) -> i64 {
        self.rows.iter().map(|r| r.copper).sum()
    }

    pub fn total_deaths(&self) -> i64 {
        self.rows.iter().map(|r| r.deaths).sum()
    }
}
