use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use tracing::{info, warn};

use raidlogger::consumes::{load_rows, parse_sunder_summary, RosterFilter};
use raidlogger::models::ConsumeReport;
use raidlogger::render::render_consume_report;
use raidlogger::settings::{init_logging, Settings};
use raidlogger::signals;

/// Render a consumable-cost leaderboard from a name,copper,deaths export
#[derive(Debug, Parser)]
#[command(name = "consume_report", version)]
struct Cli {
    /// Consumable totals export
    csv: PathBuf,
    /// Output HTML file
    out: PathBuf,
    /// Combat log used to drop pets and non-members and to date the raid
    #[arg(long)]
    combat_log: Option<PathBuf>,
    /// Character who recorded the combat log; gets the `You die.` count
    #[arg(long)]
    logger: Option<String>,
    /// Summary file holding a Sunder Armor section
    #[arg(long)]
    summary: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    init_logging(&settings.log_level);

    let (rows, delimiter) = load_rows(&cli.csv)?;
    info!(rows = rows.len(), delimiter = %(delimiter as char).escape_default(), "parsed consumable export");

    let mut report = ConsumeReport {
        source_name: cli
            .csv
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        delimiter: delimiter as char,
        rows,
        ..ConsumeReport::default()
    };

    if let Some(log) = cli.combat_log.as_deref().filter(|p| p.exists()) {
        let scan = signals::scan_combat_log(log, &settings.target_guilds, Local::now().year());
        let filter = RosterFilter {
            members: scan.members,
            pets: scan.pets,
            logger: cli.logger.clone().map(|name| (name, i64::from(scan.logger_deaths))),
        };
        info!(
            members = filter.members.len(),
            pets = filter.pets.len(),
            "filtering rows with combat log"
        );
        report.rows = filter.apply(report.rows);
        report.raid_name = scan.raid.map(str::to_string);
        report.raid_date = scan.date;
    } else if let Some(log) = &cli.combat_log {
        warn!(path = %log.display(), "combat log not found, rows left unfiltered");
    }

    if let Some(summary) = &cli.summary {
        if summary.exists() {
            report.sunders = parse_sunder_summary(summary)?;
        } else {
            warn!(path = %summary.display(), "summary file not found");
        }
    }

    if report.rows.is_empty() {
        warn!("no rows parsed, report will only contain a warning");
    }

    if let Some(parent) = cli.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("cannot create {}", parent.display()))?;
    }
    fs::write(&cli.out, render_consume_report(&report))
        .with_context(|| format!("cannot write {}", cli.out.display()))?;
    println!("Wrote {} ({} players)", cli.out.display(), report.rows.len());
    Ok(())
}
