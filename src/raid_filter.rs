use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use raidlogger::log_filter::{detect_raids, filter_log_to_raid, parse_selection, resolve_raid};
use raidlogger::settings::{init_logging, Settings};
use raidlogger::Error;

/// Detect and filter raid segments from a combat log
#[derive(Debug, Parser)]
#[command(name = "raid_filter", version)]
struct Cli {
    /// Input combat log
    log_path: PathBuf,
    /// Output path for the filtered log
    out_path: Option<PathBuf>,
    /// List detected raids and exit
    #[arg(long)]
    list: bool,
    /// Raid to keep
    #[arg(long)]
    raid: Option<String>,
    /// Prompt for a raid when several were detected
    #[arg(long)]
    interactive: bool,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    init_logging(&settings.log_level);

    let raids = detect_raids(&cli.log_path)?;
    if raids.is_empty() {
        return Err(Error::NoRaidsDetected(cli.log_path).into());
    }

    if cli.list {
        println!("Detected raids:");
        for raid in &raids {
            println!("- {}", raid);
        }
        return Ok(());
    }

    let Some(out_path) = cli.out_path else {
        bail!("out_path is required unless --list is used");
    };

    let selected = if cli.raid.is_none() && cli.interactive {
        prompt_for_raid(&raids)?
    } else {
        resolve_raid(&raids, cli.raid.as_deref())?
    };

    let kept = filter_log_to_raid(&cli.log_path, &out_path, &selected)?;
    if kept == 0 {
        bail!("no lines captured for raid '{}'", selected);
    }

    println!("Selected raid: {}", selected);
    println!("Wrote filtered combat log: {} ({} lines)", out_path.display(), kept);
    Ok(())
}

fn prompt_for_raid(raids: &[String]) -> Result<String> {
    if let [only] = raids {
        println!("Only one raid detected: {}", only);
        return Ok(only.clone());
    }

    println!("Multiple raids detected in combat log:");
    for (i, raid) in raids.iter().enumerate() {
        println!("  {}. {}", i + 1, raid);
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Select raid by number or name: ");
        io::stdout().flush()?;
        let Some(answer) = lines.next().transpose()? else {
            bail!("no raid selected");
        };
        if answer.trim().is_empty() {
            continue;
        }
        match parse_selection(&answer, raids) {
            Some(raid) => return Ok(raid),
            None => println!("Invalid selection. Try again."),
        }
    }
}
