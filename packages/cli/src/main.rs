#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the precinct map toolchain.
//!
//! Seeds the local dataset store from a manifest, resolves coordinates to
//! precincts and sectors, and prints duty calendars for the registered
//! duty groups.

mod calendar;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use precinct_map_database::{DatasetStore, DbError, paths, versions};
use precinct_map_geography_models::Point;
use precinct_map_ingest::{SeedManifest, UpgradeOutcome, run_startup};
use precinct_map_schedule::registry;
use precinct_map_spatial::{ResolverConfig, ZoneIndex};

#[derive(Parser)]
#[command(name = "precinct_map", about = "Precinct lookup and duty calendars")]
struct Cli {
    /// Dataset file (overrides `PRECINCT_MAP_DB`)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load or upgrade every dataset named in a seed manifest
    Seed {
        /// Path to the seed manifest TOML
        #[arg(long)]
        manifest: PathBuf,
    },
    /// Find the precinct and sector containing a coordinate
    Locate {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Print the match as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print whether a duty group works on a date
    Day {
        /// Duty group id (see `groups`)
        #[arg(long)]
        group: String,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: String,
    },
    /// Print a duty group's calendar for a month
    Month {
        /// Duty group id (see `groups`)
        #[arg(long)]
        group: String,
        /// Calendar year
        #[arg(long, allow_negative_numbers = true)]
        year: i32,
        /// Month, 1-12
        #[arg(long)]
        month: u32,
    },
    /// List registered duty groups
    Groups,
    /// List recorded dataset versions
    Versions,
}

fn open_store(db: Option<PathBuf>) -> Result<DatasetStore, Box<dyn std::error::Error>> {
    let path = db.unwrap_or_else(paths::db_path_from_env);
    log::debug!("Using dataset file {}", path.display());
    Ok(DatasetStore::open(&path)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Seed { manifest } => {
            let manifest = SeedManifest::load(&manifest)?;
            let ordering = versions::ordering_from_env();
            let mut store = open_store(cli.db)?;

            log::info!("Seeding with {ordering} version ordering");
            let report = run_startup(&mut store, &manifest, ordering)?;

            for outcome in &report.outcomes {
                match outcome {
                    UpgradeOutcome::UpToDate { key, version } => {
                        println!("{key:<12} up to date ({version})");
                    }
                    UpgradeOutcome::Upgraded {
                        key,
                        from,
                        to,
                        rows,
                    } => {
                        println!(
                            "{key:<12} {} -> {to} ({rows} rows)",
                            from.as_deref().unwrap_or("none")
                        );
                    }
                }
            }
            for (key, error) in &report.failures {
                println!("{key:<12} FAILED: {error}");
            }

            store.close()?;

            if !report.ready {
                return Err("dataset store is not ready; rerun seed after fixing the failures".into());
            }
            if !report.is_clean() {
                log::warn!("Some datasets kept their previous version");
            }
        }
        Commands::Locate { lat, lng, json } => {
            let store = open_store(cli.db)?;
            let index = match ZoneIndex::load(&store, ResolverConfig::from_env()) {
                Err(DbError::NotReady { missing }) => {
                    return Err(format!(
                        "datasets not loaded: {missing:?}; run `precinct_map seed --manifest <path>` first"
                    )
                    .into());
                }
                result => result?,
            };

            match index.locate(Point::new(lat, lng)) {
                Some(location) if json => {
                    println!("{}", serde_json::to_string_pretty(&location)?);
                }
                Some(location) => {
                    println!(
                        "Precinct {} ({})",
                        location.zone.id, location.zone.attributes.name
                    );
                    if let Some(sub_zone) = location.sub_zone {
                        println!("Sector   {}", sub_zone.id);
                    }
                    println!("Match    {}", location.method);
                }
                None => println!("unresolved"),
            }
        }
        Commands::Day { group, date } => {
            let schedule = registry::group(&group)?;
            let date = precinct_map_schedule::parse_date(&date)?;
            let token = precinct_map_schedule::duty_token(date, &schedule);

            println!(
                "{date} {}: {}",
                schedule.group_id(),
                if token.is_off() { "off" } else { "duty" }
            );
            if !token.is_off()
                && let Some(next) = precinct_map_schedule::next_off_day(date, &schedule)
            {
                println!("Next day off: {next}");
            }
        }
        Commands::Month { group, year, month } => {
            let schedule = registry::group(&group)?;
            print!("{}", calendar::render_month(year, month, &schedule)?);
        }
        Commands::Groups => {
            let groups = registry::all_groups();
            println!("{:<16} {:<8} {:>5}  NAME", "ID", "KIND", "CYCLE");
            println!("{}", "-".repeat(50));
            for group in &groups {
                println!(
                    "{:<16} {:<8} {:>5}  {}",
                    group.group_id(),
                    group.kind().as_ref(),
                    group.cycle_length(),
                    group.name().unwrap_or_default()
                );
            }
        }
        Commands::Versions => {
            let store = open_store(cli.db)?;
            let records = versions::list_versions(store.connection()?)?;

            if records.is_empty() {
                println!("No datasets loaded. Run `precinct_map seed --manifest <path>`.");
            }
            for record in &records {
                println!(
                    "{:<12} {:<12} {}",
                    record.key.as_ref(),
                    record.version,
                    record.last_synced_at.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}
