use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use raidlogger::models::Fight;
use raidlogger::parser::load_snapshots;
use raidlogger::raids::{boss_names, detect_raid_from_log, filter_to_boss_fights, infer_raid_from_fights};
use raidlogger::render::{build_threat_report, render_threat_report, write_json, ReportMeta};
use raidlogger::segmenter::split_fights;
use raidlogger::settings::{init_logging, Settings};
use raidlogger::signals;

const UNKNOWN_RAID: &str = "Unknown Raid";

/// Generate a raid threat HTML report from TWThreat logs
#[derive(Debug, Parser)]
#[command(name = "threat_report", version)]
struct Cli {
    /// Directory containing TWThreat log part-files
    #[arg(long, default_value = "ThreatLogs")]
    log_dir: PathBuf,
    /// Combat log used for guild, raid and role detection
    #[arg(long, default_value = "WoWCombatLog.txt")]
    combat_log: PathBuf,
    #[arg(long, default_value = "ThreatLogs/raid-threat-report.html")]
    output: PathBuf,
    /// Gap in seconds that splits fights
    #[arg(long)]
    gap: Option<f64>,
    /// Minimum fight duration in seconds
    #[arg(long)]
    min_duration: Option<f64>,
    /// Minimum snapshots in a fight
    #[arg(long)]
    min_snapshots: Option<usize>,
    /// Raid name override for boss filtering
    #[arg(long)]
    raid: Option<String>,
    /// Guild to include; repeat for several (replaces the configured list)
    #[arg(long = "guild")]
    guilds: Vec<String>,
    /// Report every unit seen in the snapshots instead of guild members only
    #[arg(long)]
    all_units: bool,
    /// Also write the computed numbers as JSON
    #[arg(long)]
    json: Option<PathBuf>,
    /// Open the report in the default browser
    #[arg(long)]
    open: bool,
    /// Settings file (defaults to ./raidlogger.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Settings, with CLI overrides on top
    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(gap) = cli.gap {
        settings.threat.gap_seconds = gap;
    }
    if let Some(min_duration) = cli.min_duration {
        settings.threat.min_duration = min_duration;
    }
    if let Some(min_snapshots) = cli.min_snapshots {
        settings.threat.min_snapshots = min_snapshots;
    }
    if !cli.guilds.is_empty() {
        settings.target_guilds = cli.guilds.clone();
    }
    init_logging(&settings.log_level);

    // 2. Snapshots -> fights
    let load = load_snapshots(&cli.log_dir)
        .with_context(|| format!("cannot load threat logs from {}", cli.log_dir.display()))?;
    let total_snapshots = load.snapshots.len();
    let all_fights = split_fights(load.snapshots, &settings.threat);

    // 3. Raid name and boss filter
    let raid_name = cli
        .raid
        .clone()
        .filter(|r| !r.trim().is_empty())
        .or_else(|| infer_raid_from_fights(&all_fights).map(str::to_string))
        .or_else(|| detect_raid_from_log(&cli.combat_log).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_RAID.to_string());
    let fights = filter_to_boss_fights(all_fights, boss_names(&raid_name));
    info!(raid = %raid_name, fights = fights.len(), "selected boss fights");

    // 4. Permitted players and their role signals
    let players = if cli.all_units {
        observed_units(&fights)
    } else {
        signals::guild_members(&cli.combat_log, &settings.target_guilds)
    };
    if players.is_empty() {
        warn!("no permitted players found; per-fight tables will be empty");
    }
    let role_signals = signals::role_signals(&cli.combat_log, &players);

    // 5. Report
    let meta = ReportMeta {
        raid_name,
        target_guilds: if cli.all_units { Vec::new() } else { settings.target_guilds.clone() },
        source_files: load.source_files,
        skipped_files: load.skipped,
        params: settings.threat,
        total_snapshots,
    };
    let report = build_threat_report(&fights, &players, &role_signals, meta);

    if let Some(parent) = cli.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("cannot create {}", parent.display()))?;
    }
    fs::write(&cli.output, render_threat_report(&report))
        .with_context(|| format!("cannot write {}", cli.output.display()))?;

    if let Some(json_path) = &cli.json {
        write_json(&report, json_path)?;
    }

    println!(
        "Wrote {} ({} boss fights from {} snapshots; raid={})",
        cli.output.display(),
        report.fights.len(),
        total_snapshots,
        report.raid_name
    );

    if cli.open {
        if let Err(err) = open::that(&cli.output) {
            warn!(error = %err, "could not open report in browser");
        }
    }
    Ok(())
}

fn observed_units(fights: &[Fight]) -> HashSet<String> {
    fights
        .iter()
        .flat_map(|f| &f.snapshots)
        .flat_map(|s| &s.entries)
        .map(|e| e.unit.clone())
        .collect()
}
