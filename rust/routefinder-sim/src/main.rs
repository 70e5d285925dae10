use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use routefinder_core::{GridMap, SchedulerRecord};
use routefinder_sim::load::{load_map, load_map_json, open_read_only};
use routefinder_sim::{run, Scenario};

#[derive(Parser, Debug)]
#[command(name = "routefinder-sim", version, about = "Drive the route scheduler over a tile map")]
#[command(group(ArgGroup::new("world").required(true).args(["map", "sqlite"])))]
struct Args {
    /// JSON map file
    #[arg(long = "map", value_name = "PATH")]
    map: Option<PathBuf>,

    /// SQLite map with `tiles` and `actors` tables
    #[arg(long = "sqlite", value_name = "PATH")]
    sqlite: Option<PathBuf>,

    /// Scenario with options, profiles and requests
    #[arg(long = "scenario", value_name = "PATH")]
    scenario: Option<PathBuf>,

    /// Saved scheduler state to continue from instead of the scenario's requests
    #[arg(long = "resume", value_name = "PATH")]
    resume: Option<PathBuf>,

    /// Where to write the scheduler state after the run
    #[arg(long = "save", value_name = "PATH")]
    save: Option<PathBuf>,

    /// Frames to simulate
    #[arg(long = "ticks", value_name = "N", default_value_t = 600)]
    ticks: u32,

    /// Emit logs as JSON
    #[arg(long = "json-logs")]
    json_logs: bool,
}

fn load_world(args: &Args) -> Result<GridMap> {
    match (&args.map, &args.sqlite) {
        (Some(path), _) => load_map_json(path),
        (None, Some(path)) => {
            let conn = open_read_only(path).with_context(|| format!("failed to open {:?}", path))?;
            load_map(&conn)
        }
        (None, None) => anyhow::bail!("either --map or --sqlite is required"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }
    info!(core_version = %routefinder_core::version(), ?args, "starting routefinder-sim");

    let mut map = load_world(&args)?;
    let scenario = match &args.scenario {
        Some(path) => Scenario::from_path(path)?,
        None => Scenario::default(),
    };
    let mut scheduler = scenario.scheduler()?;
    match &args.resume {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
            let record: SchedulerRecord =
                serde_json::from_str(&text).with_context(|| format!("invalid scheduler state {:?}", path))?;
            scheduler.load(&record).with_context(|| format!("failed to restore {:?}", path))?;
            info!(requests = scheduler.len(), "resumed");
        }
        None => scenario.schedule(&mut scheduler, &map)?,
    }

    let summary = run(&mut scheduler, &mut map, args.ticks);
    info!(ticks = summary.ticks, expansions = summary.expansions, finished = summary.finished.len(), "run done");

    if let Some(path) = &args.save {
        let json = serde_json::to_string_pretty(&scheduler.save())?;
        fs::write(path, json).with_context(|| format!("failed to write {:?}", path))?;
        info!(path = ?path, requests = scheduler.len(), "wrote scheduler state");
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
