use std::collections::HashSet;
use std::ops::ControlFlow;
use std::path::Path;

use crate::models::Fight;
use crate::signals;

/// Raid name and the lowercase keyword identifying it in a zone name
pub const RAID_ZONE_KEYWORDS: &[(&str, &str)] = &[
    ("Naxxramas", "naxxramas"),
    ("Onyxia's Lair", "onyxia"),
    ("Molten Core", "molten core"),
    ("Blackwing Lair", "blackwing lair"),
    ("Temple of Ahn'Qiraj", "ahn'qiraj temple"),
    ("Ruins of Ahn'Qiraj", "ruins of ahn'qiraj"),
    ("Zul'Gurub", "zul'gurub"),
    ("Zul'Aman", "zul'aman"),
    ("Sunwell Plateau", "sunwell plateau"),
    ("Black Temple", "black temple"),
    ("Karazhan", "karazhan"),
    ("Gruul's Lair", "gruul's lair"),
    ("Magtheridon's Lair", "magtheridon's lair"),
    ("Serpentshrine Cavern", "serpentshrine cavern"),
    ("Tempest Keep", "tempest keep"),
    ("Battle for Mount Hyjal", "hyjal summit"),
];

/// Older zone spellings still found in some logs
const LEGACY_ZONE_ALIASES: &[(&str, &str)] = &[
    ("aq40", "Temple of Ahn'Qiraj"),
    ("aq20", "Ruins of Ahn'Qiraj"),
    ("tempest", "Tempest Keep"),
    ("serpentshrine", "Serpentshrine Cavern"),
];

pub const RAID_BOSSES: &[(&str, &[&str])] = &[
    (
        "Naxxramas",
        &[
            "Anub'Rekhan",
            "Grand Widow Faerlina",
            "Maexxna",
            "Noth the Plaguebringer",
            "Heigan the Unclean",
            "Loatheb",
            "Instructor Razuvious",
            "Gothik the Harvester",
            "The Four Horsemen",
            "Patchwerk",
            "Grobbulus",
            "Gluth",
            "Thaddius",
            "Sapphiron",
            "Kel'Thuzad",
        ],
    ),
    ("Onyxia's Lair", &["Onyxia"]),
    (
        "Molten Core",
        &[
            "Lucifron",
            "Magmadar",
            "Gehennas",
            "Garr",
            "Shazzrah",
            "Baron Geddon",
            "Golemagg the Incinerator",
            "Sulfuron Harbinger",
            "Majordomo Executus",
            "Ragnaros",
        ],
    ),
    (
        "Blackwing Lair",
        &[
            "Razorgore the Untamed",
            "Vaelastrasz the Corrupt",
            "Broodlord Lashlayer",
            "Firemaw",
            "Ebonroc",
            "Flamegor",
            "Chromaggus",
            "Nefarian",
        ],
    ),
    (
        "Temple of Ahn'Qiraj",
        &[
            "The Prophet Skeram",
            "Battleguard Sartura",
            "Fankriss the Unyielding",
            "Princess Huhuran",
            "Viscidus",
            "Twin Emperors",
            "Ouro",
            "C'Thun",
        ],
    ),
    (
        "Ruins of Ahn'Qiraj",
        &[
            "Kurinnaxx",
            "General Rajaxx",
            "Moam",
            "Buru the Gorger",
            "Ayamiss the Hunter",
            "Ossirian the Unscarred",
        ],
    ),
    (
        "Zul'Gurub",
        &[
            "High Priest Venoxis",
            "High Priestess Jeklik",
            "High Priestess Mar'li",
            "High Priest Thekal",
            "High Priestess Arlokk",
            "Jin'do the Hexxer",
            "Hakkar",
        ],
    ),
];

/// Map a zone name to the raid it belongs to
pub fn zone_to_raid(zone: &str) -> Option<&'static str> {
    let zone = zone.trim().to_lowercase();
    if zone.is_empty() {
        return None;
    }

    RAID_ZONE_KEYWORDS
        .iter()
        .find(|(_, keyword)| zone.contains(keyword))
        .map(|(raid, _)| *raid)
        .or_else(|| {
            LEGACY_ZONE_ALIASES
                .iter()
                .find(|(alias, _)| zone.contains(alias))
                .map(|(_, raid)| *raid)
        })
}

/// Boss list of a raid; empty for raids without one
pub fn boss_names(raid: &str) -> &'static [&'static str] {
    RAID_BOSSES
        .iter()
        .find(|(name, _)| *name == raid)
        .map(|(_, bosses)| *bosses)
        .unwrap_or(&[])
}

/// Raid whose boss list shares the most names with the fought targets
pub fn infer_raid_from_fights(fights: &[Fight]) -> Option<&'static str> {
    let targets: HashSet<&str> = fights.iter().map(|f| f.target_name.as_str()).collect();

    let mut best: Option<&'static str> = None;
    let mut best_hits = 0;
    for (raid, bosses) in RAID_BOSSES {
        let hits = bosses.iter().filter(|b| targets.contains(*b)).count();
        if hits > best_hits {
            best_hits = hits;
            best = Some(*raid);
        }
    }
    best
}

/// Keep fights against a listed boss; an empty list keeps everything
pub fn filter_to_boss_fights(fights: Vec<Fight>, bosses: &[&str]) -> Vec<Fight> {
    if bosses.is_empty() {
        return fights;
    }
    fights
        .into_iter()
        .filter(|f| bosses.contains(&f.target_name.as_str()))
        .collect()
}

/// First raid zone entered in a combat log; a missing or unreadable log
/// yields `None` with a warning
pub fn detect_raid_from_log(path: &Path) -> Option<&'static str> {
    let mut found = None;
    signals::scan_optional(path, "raid detection", |line| {
        found = signals::zone_name(line).and_then(zone_to_raid);
        if found.is_some() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snapshot;

    fn fight(name: &str) -> Fight {
        let mut f = Fight::new("guid".to_string(), name.to_string());
        f.snapshots.push(Snapshot {
            time: 0.0,
            sender: "Tanky".to_string(),
            target_guid: "guid".to_string(),
            target_name: name.to_string(),
            entries: Vec::new(),
        });
        f
    }

    #[test]
    fn maps_zones_to_raids() {
        assert_eq!(zone_to_raid("Molten Core"), Some("Molten Core"));
        assert_eq!(zone_to_raid("  ONYXIA'S LAIR "), Some("Onyxia's Lair"));
        assert_eq!(zone_to_raid("Ahn'Qiraj Temple"), Some("Temple of Ahn'Qiraj"));
        assert_eq!(zone_to_raid("aq20"), Some("Ruins of Ahn'Qiraj"));
        assert_eq!(zone_to_raid("Orgrimmar"), None);
        assert_eq!(zone_to_raid(""), None);
    }

    #[test]
    fn infers_raid_from_boss_targets() {
        let fights = vec![fight("Lucifron"), fight("Garr"), fight("Onyxia"), fight("Core Hound")];
        assert_eq!(infer_raid_from_fights(&fights), Some("Molten Core"));
        assert_eq!(infer_raid_from_fights(&[fight("Core Hound")]), None);
    }

    #[test]
    fn boss_filter_drops_trash() {
        let fights = vec![fight("Lucifron"), fight("Core Hound"), fight("Ragnaros")];
        let kept = filter_to_boss_fights(fights, boss_names("Molten Core"));
        let names: Vec<&str> = kept.iter().map(|f| f.target_name.as_str()).collect();
        assert_eq!(names, vec!["Lucifron", "Ragnaros"]);
    }

    #[test]
    fn unknown_raid_keeps_all_fights() {
        let fights = vec![fight("Core Hound")];
        assert!(boss_names("Unknown Raid").is_empty());
        assert_eq!(filter_to_boss_fights(fights, boss_names("Unknown Raid")).len(), 1);
    }

    #[test]
    fn first_raid_zone_in_log_wins() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("WoWCombatLog.txt");
        std::fs::write(
            &log,
            "3/14 19:00:00.000  ZONE_INFO: 19:00:00&Orgrimmar&0\n\
             3/14 19:30:00.000  ZONE_INFO: 19:30:00&Molten Core&0\n\
             3/14 21:30:00.000  ZONE_INFO: 21:30:00&Onyxia's Lair&0\n",
        )
        .unwrap();
        assert_eq!(detect_raid_from_log(&log), Some("Molten Core"));
        assert_eq!(detect_raid_from_log(&dir.path().join("absent.txt")), None);
    }
}
