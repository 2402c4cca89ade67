// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ttloc::geo::LatLon;
use ttloc::io;
use ttloc::{intersect, LocatorConfig, LocatorRegistry, RelocateOrchestrator, TravelTimeTable};

#[derive(Parser)]
#[command(name = "ttloc", about = "Travel-time tables and hypocenter relocation")]
struct Cli {
    /// Configuration file (TOML); defaults apply when omitted
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Table directory, overrides the configuration
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    /// Earth model profile, overrides the configured default
    #[arg(short = 'p', long, global = true)]
    profile: Option<String>,

    /// Log debug output to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print travel times of all phases for one source-receiver pair
    Traveltimes {
        /// Source depth in km
        #[arg(long)]
        depth: f64,

        /// Epicentral distance in degrees
        #[arg(long, conflicts_with_all = ["source", "receiver"])]
        distance: Option<f64>,

        /// Source position "lat,lon"
        #[arg(long, requires = "receiver")]
        source: Option<String>,

        /// Receiver position "lat,lon"
        #[arg(long, requires = "source")]
        receiver: Option<String>,

        /// Receiver elevation in metres
        #[arg(long, default_value = "0.0")]
        elevation: f64,

        /// Print only the first arrival
        #[arg(long)]
        first: bool,
    },

    /// Intersect two back-azimuth rays
    Cross {
        /// First reference point "lat,lon"
        #[arg(long)]
        p1: String,

        /// Azimuth of the first ray in degrees
        #[arg(long, allow_hyphen_values = true)]
        az1: f64,

        /// Second reference point "lat,lon"
        #[arg(long)]
        p2: String,

        /// Azimuth of the second ray in degrees
        #[arg(long, allow_hyphen_values = true)]
        az2: f64,
    },

    /// Relocate the origin of an event bundle (JSON)
    Relocate {
        /// Event bundle with origin, picks and stations
        event: PathBuf,

        /// Locator name
        #[arg(short = 'l', long, default_value = "GRIDSEARCH")]
        locator: String,

        /// Keep the depth fixed (km)
        #[arg(long)]
        fixed_depth: Option<f64>,

        /// Start from a first-cut estimate instead of the input location
        #[arg(long)]
        ignore_initial: bool,

        /// Output file; stdout when omitted
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Resample one phase table onto a regular grid (.npy, .tbl or .tab)
    Export {
        /// Phase code
        #[arg(long)]
        phase: String,

        /// Distance axis "start,stop,count" in degrees
        #[arg(long, default_value = "0,180,181")]
        distances: String,

        /// Depth axis "start,stop,count" in km
        #[arg(long, default_value = "0,700,36")]
        depths: String,

        /// Output file path
        #[arg(short = 'o', long, default_value = "grid.npy")]
        output: PathBuf,
    },
}

fn parse_point(s: &str, what: &str) -> Result<LatLon> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: expected 'lat,lon'", what))?;
    if parts.len() != 2 {
        bail!("{} has {} components, expected 2", what, parts.len());
    }
    Ok(LatLon::new(parts[0], parts[1]))
}

fn parse_axis(s: &str, what: &str) -> Result<Vec<f64>> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("{} expects 'start,stop,count', got '{}'", what, s);
    }
    let start: f64 = parts[0].parse().with_context(|| format!("invalid {} start", what))?;
    let stop: f64 = parts[1].parse().with_context(|| format!("invalid {} stop", what))?;
    let count: usize = parts[2].parse().with_context(|| format!("invalid {} count", what))?;
    if count == 0 || stop < start {
        bail!("{} must have count >= 1 and stop >= start", what);
    }
    Ok(io::linspace(start, stop, count))
}

fn load_config(cli: &Cli) -> Result<LocatorConfig> {
    let mut config = match &cli.config {
        Some(path) => LocatorConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LocatorConfig::default(),
    };
    if let Some(dir) = &cli.tables {
        config.tables.directory = dir.clone();
    }
    if let Some(profile) = &cli.profile {
        config.profile(Some(profile))?;
        config.tables.default_profile = profile.clone();
    }
    Ok(config)
}

fn load_tables(config: &LocatorConfig) -> Result<TravelTimeTable> {
    let (dir, model) = config.profile(None)?;
    let ttt = TravelTimeTable::load(&dir, &model, &config.tables.phases)
        .with_context(|| format!("loading tables of '{}' from {}", model, dir.display()))?;
    Ok(ttt
        .with_extrapolation(config.tables.extrapolate)
        .with_elevation_correction(config.tables.elevation_correction))
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;

    match &cli.command {
        Command::Traveltimes {
            depth,
            distance,
            source,
            receiver,
            elevation,
            first,
        } => {
            let mut ttt = load_tables(&config)?;
            let times = match (distance, source, receiver) {
                (Some(d), _, _) => ttt.compute_distance(*d, *depth),
                (None, Some(s), Some(r)) => {
                    let s = parse_point(s, "--source")?;
                    let r = parse_point(r, "--receiver")?;
                    ttt.compute(s.lat, s.lon, *depth, r.lat, r.lon, *elevation)
                }
                _ => bail!("give either --distance or both --source and --receiver"),
            };
            if times.is_empty() {
                bail!("no phase available");
            }
            let shown = if *first { &times[..1] } else { &times[..] };
            println!("{:<8} {:>10} {:>9} {:>9}", "phase", "time", "dtdd", "dtdh");
            for tt in shown {
                println!(
                    "{:<8} {:>10.3} {:>9.4} {:>9.5}",
                    tt.phase, tt.time, tt.dtdd, tt.dtdh
                );
            }
        }

        Command::Cross { p1, az1, p2, az2 } => {
            let a = parse_point(p1, "--p1")?;
            let b = parse_point(p2, "--p2")?;
            let c = intersect(a, *az1, b, *az2)?;
            println!(
                "lat={:.4} lon={:.4} dist1={:.4} dist2={:.4}",
                c.lat, c.lon, c.dist1, c.dist2
            );
        }

        Command::Relocate {
            event,
            locator,
            fixed_depth,
            ignore_initial,
            output,
        } => {
            if fixed_depth.is_some() {
                config.search.fixed_depth_km = *fixed_depth;
            }
            config.search.ignore_initial_location |= *ignore_initial;
            config.validate()?;

            let bundle = io::load_event(event)
                .with_context(|| format!("reading event {}", event.display()))?;
            let catalog = bundle.catalog();
            let registry = LocatorRegistry::with_builtin();
            let mut loc = registry.create(locator, &config)?;
            let result = RelocateOrchestrator::new(loc.as_mut(), &catalog)
                .with_settings(&config.relocate)
                .relocate(&bundle.origin)?;

            match output {
                Some(path) => io::save_origin(&result, path)?,
                None => println!("{}", serde_json::to_string_pretty(&result)?),
            }
        }

        Command::Export {
            phase,
            distances,
            depths,
            output,
        } => {
            let xs = parse_axis(distances, "--distances")?;
            let ys = parse_axis(depths, "--depths")?;
            let ttt = load_tables(&config)?;
            let Some(table) = ttt.table(phase) else {
                bail!("phase '{}' not loaded for model '{}'", phase, ttt.model());
            };
            io::export_grid(table, &xs, &ys, output)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(&cli)
}
