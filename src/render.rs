//! Static HTML output for the threat and consumable reports.
//!
//! Rendering is split from computation: [`build_threat_report`] produces the
//! numbers, [`render_threat_report`] only lays them out.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::consumes::{copper_to_gsc, copper_to_gsc_short};
use crate::error::{Error, Result};
use crate::models::*;
use crate::roles::classify_unit;
use crate::segmenter::SegmentParams;
use crate::stats::{build_unit_stats, RaidSummaryBuilder};

/// Consume report bars are scaled to this width for the top spender
pub const BAR_WIDTH_PX: f64 = 520.0;

/// Inputs of a threat report that do not come from the fights themselves
#[derive(Debug, Clone, Default)]
pub struct ReportMeta {
    pub raid_name: String,
    pub target_guilds: Vec<String>,
    pub source_files: Vec<String>,
    pub skipped_files: Vec<SkippedFile>,
    pub params: SegmentParams,
    /// Snapshots loaded before segmentation
    pub total_snapshots: usize,
}

/// Compute per-fight tables and the raid summary for the permitted players
pub fn build_threat_report(
    fights: &[Fight],
    players: &HashSet<String>,
    signals: &HashMap<String, RoleSignals>,
    meta: ReportMeta,
) -> ThreatReport {
    let mut summary = RaidSummaryBuilder::new();
    let mut fight_reports = Vec::with_capacity(fights.len());

    for (i, fight) in fights.iter().enumerate() {
        let stats = build_unit_stats(fight, players);
        summary.add_fight(&stats);

        let mut units: Vec<UnitRow> = stats
            .into_iter()
            .map(|(unit, stats)| UnitRow {
                role: classify_unit(&unit, stats.avg_top_pct, stats.primary_target_ratio, signals),
                unit,
                stats,
            })
            .collect();
        units.sort_by(|a, b| b.stats.threat_gained.total_cmp(&a.stats.threat_gained));

        fight_reports.push(FightReport {
            index: i + 1,
            target_guid: fight.target_guid.clone(),
            target_name: fight.target_name.clone(),
            start: fight.start(),
            duration_secs: fight.duration(),
            snapshot_count: fight.snapshots.len(),
            units,
        });
    }

    ThreatReport {
        raid_name: meta.raid_name,
        target_guilds: meta.target_guilds,
        source_files: meta.source_files,
        skipped_files: meta.skipped_files,
        gap_seconds: meta.params.gap_seconds,
        min_duration: meta.params.min_duration,
        min_snapshots: meta.params.min_snapshots,
        total_snapshots: meta.total_snapshots,
        players_seen: players.len(),
        fights: fight_reports,
        raid_summary: summary.finish(signals),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Group the digits of an integer string with commas
fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `1234567.89` -> `1,234,567.9`
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.1}", value.abs());
    let (int_part, frac) = formatted.split_once('.').unwrap_or((formatted.as_str(), "0"));
    let sign = if value < 0.0 && formatted != "0.0" { "-" } else { "" };
    format!("{}{}.{}", sign, group_digits(int_part), frac)
}

/// `12345` -> `12,345`
pub fn format_count(value: usize) -> String {
    group_digits(&value.to_string())
}

fn role_badge(role: Role) -> String {
    format!("<span class='badge {}'>{}</span>", role.css_class(), role.label())
}

const THREAT_STYLE: &str = r#"
    * { margin:0; padding:0; box-sizing:border-box; }
    body { width:1200px; background:linear-gradient(155deg,#0a0e14 0%,#131922 40%,#0f1419 100%); font-family:'Fira Sans',sans-serif; color:#e6edf3; }
    .container { padding:32px 44px 48px; }
    .header { display:flex; justify-content:space-between; align-items:flex-end; margin-bottom:20px; }
    .title { font-family:'Cinzel',serif; font-size:34px; font-weight:700; color:#f0f6fc; letter-spacing:1px; }
    .subtitle { margin-top:6px; color:#8b949e; font-size:13px; }
    .server-badge { background:rgba(34,197,94,.12); border:1px solid rgba(34,197,94,.3); padding:8px 18px; border-radius:20px; font-size:12px; font-weight:600; color:#4ade80; letter-spacing:1px; text-transform:uppercase; }
    .stats-row { display:flex; gap:16px; margin-bottom:20px; }
    .stat-card { flex:1; background:rgba(22,27,34,.7); border:1px solid rgba(48,54,61,.6); border-radius:12px; padding:14px 18px; }
    .stat-label { font-size:10px; color:#6e7681; text-transform:uppercase; letter-spacing:1.5px; margin-bottom:6px; }
    .stat-value { font-size:26px; font-weight:700; color:#f0f6fc; }
    .panel { background:rgba(22,27,34,.6); border:1px solid rgba(48,54,61,.5); border-radius:12px; padding:16px; margin-bottom:16px; }
    .panel-header { display:flex; justify-content:space-between; align-items:baseline; margin-bottom:10px; gap:20px; }
    .panel h3 { font-size:18px; color:#f0f6fc; }
    .panel.empty { text-align:center; color:#8b949e; padding:32px 16px; }
    .fight-meta { font-size:12px; color:#8b949e; white-space:nowrap; }
    table { width:100%; border-collapse:collapse; }
    th, td { padding:8px 10px; text-align:left; border-bottom:1px solid rgba(110,118,129,.25); font-size:13px; }
    th { font-size:11px; color:#8b949e; text-transform:uppercase; letter-spacing:1px; }
    .badge { display:inline-block; padding:2px 8px; border-radius:999px; font-size:11px; border:1px solid transparent; }
    .badge.tank { color:#fca5a5; border-color:rgba(248,113,113,.5); background:rgba(127,29,29,.2); }
    .badge.healer { color:#86efac; border-color:rgba(34,197,94,.5); background:rgba(20,83,45,.2); }
    .badge.dps { color:#93c5fd; border-color:rgba(59,130,246,.5); background:rgba(30,58,138,.2); }
    .footnote { margin-top:8px; color:#6e7681; font-size:12px; line-height:1.5; }
"#;

fn stat_card(out: &mut String, label: &str, value: &str) {
    let _ = write!(
        out,
        "<div class='stat-card'><div class='stat-label'>{}</div><div class='stat-value'>{}</div></div>",
        label, value
    );
}

fn render_summary_panel(out: &mut String, report: &ThreatReport) {
    out.push_str("    <section class='panel'>\n");
    out.push_str("      <div class='panel-header'><h3>Raid Summary</h3></div>\n");
    out.push_str("      <table>\n");
    out.push_str(
        "        <thead><tr><th>Player</th><th>Role</th><th>Fights</th><th>Total Threat Done</th>\
         <th>Weighted TPS</th><th>Avg Top %</th><th>Heals</th><th>Taunts</th></tr></thead>\n",
    );
    out.push_str("        <tbody>");
    for row in &report.raid_summary {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td>{}</td><td>{}</td></tr>",
            escape_html(&row.unit),
            role_badge(row.role),
            row.fights,
            format_thousands(row.threat_gained),
            format_thousands(row.threat_per_second),
            row.avg_top_pct,
            row.signals.heals,
            row.signals.taunts,
        );
    }
    out.push_str("</tbody>\n      </table>\n");

    let files = report.source_files.join(", ");
    let _ = writeln!(out, "      <p class='footnote'>Input files: {}</p>", escape_html(&files));
    if !report.skipped_files.is_empty() {
        let skipped: Vec<String> = report
            .skipped_files
            .iter()
            .map(|s| format!("{} ({})", s.filename, s.reason))
            .collect();
        let _ = writeln!(
            out,
            "      <p class='footnote'>Skipped files: {}</p>",
            escape_html(&skipped.join(", "))
        );
    }
    let _ = writeln!(
        out,
        "      <p class='footnote'>Fights are grouped by target GUID + target name and split when gaps exceed {:.0}s. \
         Fights shorter than {:.0}s or with fewer than {} snapshots are dropped. \
         Non-boss targets are removed using the boss list for {}.</p>",
        report.gap_seconds,
        report.min_duration,
        report.min_snapshots,
        escape_html(&report.raid_name)
    );
    out.push_str("    </section>\n");
}

fn render_fight_panel(out: &mut String, fight: &FightReport) {
    out.push_str("    <section class='panel'>\n");
    let _ = writeln!(
        out,
        "      <div class='panel-header'><h3>{}. {}</h3><div class='fight-meta'>{:.1}s &bull; {} snapshots</div></div>",
        fight.index,
        escape_html(&fight.target_name),
        fight.duration_secs,
        format_count(fight.snapshot_count)
    );
    out.push_str("      <table>\n");
    out.push_str(
        "        <thead><tr><th>Player</th><th>Role</th><th>Threat Done</th><th>TPS</th>\
         <th>Avg Top %</th><th>Samples</th></tr></thead>\n",
    );
    out.push_str("        <tbody>");
    for row in &fight.units {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td>{}</td></tr>",
            escape_html(&row.unit),
            role_badge(row.role),
            format_thousands(row.stats.threat_gained),
            format_thousands(row.stats.threat_per_second),
            row.stats.avg_top_pct,
            row.stats.samples,
        );
    }
    out.push_str("</tbody>\n      </table>\n    </section>\n");
}

/// Full self-contained HTML document for a threat report
pub fn render_threat_report(report: &ThreatReport) -> String {
    let mut out = String::with_capacity(16 * 1024);
    out.push_str("<!DOCTYPE html>\n<html lang='en'>\n<head>\n");
    out.push_str("  <meta charset='UTF-8'>\n  <meta name='viewport' content='width=1200'>\n");
    out.push_str("  <title>Raid Threat Report</title>\n");
    let _ = writeln!(out, "  <style>{}  </style>", THREAT_STYLE);
    out.push_str("</head>\n<body>\n  <div class='container'>\n");

    let guilds = if report.target_guilds.is_empty() {
        "all observed units".to_string()
    } else {
        format!("guild-filtered players only ({})", report.target_guilds.join(", "))
    };
    let _ = writeln!(
        out,
        "    <div class='header'><div><div class='title'>Raid Threat Report</div>\
         <div class='subtitle'>{} &bull; {}</div></div><div class='server-badge'>TWThreat v4</div></div>",
        escape_html(&report.raid_name),
        escape_html(&guilds)
    );

    out.push_str("    <div class='stats-row'>");
    stat_card(&mut out, "Detected Boss Fights", &format_count(report.fights.len()));
    stat_card(&mut out, "Boss Targets", &format_count(report.boss_target_count()));
    stat_card(&mut out, "Threat Snapshots", &format_count(report.fight_snapshot_total()));
    stat_card(&mut out, "Players Seen", &format_count(report.players_seen));
    out.push_str("</div>\n");

    if report.fights.is_empty() {
        out.push_str(
            "    <section class='panel empty'><h3>No data</h3>\
             <p class='footnote'>No fights passed the segmentation filters for this log set.</p></section>\n",
        );
    }

    render_summary_panel(&mut out, report);
    for fight in &report.fights {
        render_fight_panel(&mut out, fight);
    }

    out.push_str("  </div>\n</body>\n</html>\n");
    out
}

/// Write the report as pretty-printed JSON next to the HTML
pub fn write_json(report: &ThreatReport, path: &Path) -> Result {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;
    }
    fs::write(path, json).map_err(|e| Error::write(path, e))?;
    info!(path = %path.display(), "wrote JSON sidecar");
    Ok(())
}

/// Horizontal bar scaled against the largest value; empty when nothing is positive
pub fn make_bar(value: i64, max_value: i64) -> String {
    if max_value <= 0 {
        return String::new();
    }
    let width = ((value as f64 / max_value as f64) * BAR_WIDTH_PX) as i64;
    format!("<div class=\"bar\" style=\"width:{}px\"></div>", width.max(0))
}

const CONSUME_STYLE: &str = r#"
    body { font-family: Arial, sans-serif; margin: 24px; }
    h1 { margin: 0 0 8px 0; }
    h2 { margin: 24px 0 8px 0; font-size: 18px; }
    .meta { color: #555; margin-bottom: 18px; }
    .warn { background:#fff3cd; border:1px solid #ffeeba; padding:12px; border-radius:8px; margin: 14px 0; }
    table { border-collapse: collapse; width: 100%; }
    th, td { border-bottom: 1px solid #ddd; padding: 8px; text-align: left; }
    th { background: #f4f4f4; }
    .barwrap { display:flex; align-items:center; gap:12px; }
    .bar { height: 14px; background: #333; border-radius: 8px; }
    .num { white-space: nowrap; font-variant-numeric: tabular-nums; }
    .small { color:#666; font-size: 12px; }
"#;

/// Full HTML document for the consumable-cost leaderboard
pub fn render_consume_report(report: &ConsumeReport) -> String {
    let total = report.total_copper();
    let max = report.rows.first().map(|r| r.copper).unwrap_or(0);

    let mut out = String::with_capacity(8 * 1024);
    out.push_str("<!doctype html>\n<html>\n<head>\n  <meta charset=\"utf-8\" />\n");
    out.push_str("  <title>Consume Report</title>\n");
    let _ = writeln!(out, "  <style>{}  </style>", CONSUME_STYLE);
    out.push_str("</head>\n<body>\n  <h1>Consume totals (per player)</h1>\n  <div class=\"meta\">\n");

    if let Some(raid) = &report.raid_name {
        let _ = writeln!(out, "    Raid: <span class=\"num\">{}</span><br/>", escape_html(raid));
    }
    if let Some(date) = report.raid_date {
        let _ = writeln!(out, "    Date: <span class=\"num\">{}</span><br/>", date.format("%Y-%m-%d"));
    }
    let delimiter = match report.delimiter {
        '\t' => "tab".to_string(),
        c => c.to_string(),
    };
    let _ = write!(
        out,
        "    File: <span class=\"num\">{}</span><br/>\n    \
         Players: <span class=\"num\">{}</span><br/>\n    \
         Total cost: <span class=\"num\">{}</span> <span class=\"small\">({} copper)</span><br/>\n    \
         Deaths: <span class=\"num\">{}</span><br/>\n    \
         Delimiter detected: <span class=\"num\">{}</span>\n  </div>\n",
        escape_html(&report.source_name),
        report.rows.len(),
        copper_to_gsc_short(total),
        total,
        report.total_deaths(),
        escape_html(&delimiter),
    );

    if report.rows.is_empty() {
        out.push_str(
            "  <div class=\"warn\">\n    <b>No rows parsed from the CSV.</b><br/>\n    \
             Open the export and confirm it contains rows like <code>Name,1337,2</code>.\n  </div>\n",
        );
    } else {
        out.push_str(
            "  <table>\n    <thead><tr><th>#</th><th>Player</th><th>Total cost</th><th>Deaths</th><th>Visual</th></tr></thead>\n    <tbody>\n",
        );
        for (i, row) in report.rows.iter().enumerate() {
            let _ = writeln!(
                out,
                "      <tr><td class=\"num\">{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>\
                 <td><div class=\"barwrap\">{}<span class=\"small num\">{}</span></div></td></tr>",
                i + 1,
                escape_html(&row.name),
                copper_to_gsc(row.copper),
                row.deaths,
                make_bar(row.copper, max),
                row.copper,
            );
        }
        out.push_str("    </tbody>\n  </table>\n");
    }

    if !report.sunders.is_empty() {
        render_sunder_table(&mut out, &report.sunders);
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn render_sunder_table(out: &mut String, sunders: &[SunderCount]) {
    let mut ranked: Vec<&SunderCount> = sunders.iter().collect();
    ranked.sort_by(|a, b| b.total().cmp(&a.total()).then_with(|| a.name.cmp(&b.name)));
    let max = ranked.first().map(|s| s.total()).unwrap_or(0);

    out.push_str("  <h2>Sunder Armor</h2>\n  <table>\n");
    out.push_str("    <thead><tr><th>Player</th><th>Trash</th><th>Boss</th><th>Total</th><th>Visual</th></tr></thead>\n    <tbody>\n");
    for s in ranked {
        let _ = writeln!(
            out,
            "      <tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td>{}</td></tr>",
            escape_html(&s.name),
            s.trash,
            s.boss,
            s.total(),
            make_bar(s.total(), max),
        );
    }
    out.push_str("    </tbody>\n  </table>\n");
}
