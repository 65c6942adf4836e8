#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line property lookups against the parcel pipeline.
//!
//! ```text
//! parcel_map_cli lookup 5843-004-015
//! parcel_map_cli lookup "17523 Bramble Ct, Canyon Country" --json
//! parcel_map_cli parcel 5843004015
//! parcel_map_cli jurisdiction -- -13165226 4035161
//! parcel_map_cli zoning 5843004015
//! parcel_map_cli overlays 5843004015
//! parcel_map_cli assessor 5843004015
//! parcel_map_cli cache-stats
//! ```
//!
//! `RUST_LOG=debug` surfaces per-stage query logging. `--providers` points
//! at a JSON file replacing the builtin city registry; the
//! `PARCEL_MAP_PROVIDERS` environment variable does the same without the
//! flag.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use parcel_map_geometry::area;
use parcel_map_jurisdiction::ProviderRegistry;
use parcel_map_lookup::{CountyConfig, Engine};
use parcel_map_models::{
    AssessorOutcome, AssessorRecord, Jurisdiction, JurisdictionKind, OverlayHit, ParcelFeature,
    Point, PropertyReport, ZoningOutcome,
};
use parcel_map_query::ArcgisClient;

#[derive(Parser)]
#[command(
    name = "parcel_map_cli",
    about = "Parcel, zoning, overlay, and assessor lookups for Los Angeles County"
)]
struct Cli {
    /// JSON file replacing the builtin city provider registry
    #[arg(long, global = true)]
    providers: Option<String>,
    /// Print raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full property report: parcel, jurisdiction, zoning, overlays, assessor
    Lookup {
        /// Parcel identifier (AIN or APN) or situs address
        input: String,
    },
    /// Resolve an identifier or address to its parcel feature
    Parcel {
        /// Parcel identifier (AIN or APN) or situs address
        input: String,
    },
    /// Classify the governing body for a Web Mercator point
    Jurisdiction { x: f64, y: f64 },
    /// Zoning determination for a parcel
    Zoning {
        /// Parcel identifier (AIN or APN) or situs address
        input: String,
    },
    /// Overlay districts covering a parcel
    Overlays {
        /// Parcel identifier (AIN or APN) or situs address
        input: String,
    },
    /// Assessor roll record for a parcel
    Assessor {
        /// Parcel identifier (AIN or APN) or situs address
        input: String,
    },
    /// Occupancy of the shared lookup caches
    CacheStats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let engine = build_engine(cli.providers.as_deref())?;

    match cli.command {
        Commands::Lookup { input } => {
            let report = engine.lookup_property(&input).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Parcel { input } => match engine.resolve_parcel(&input).await {
            Some(parcel) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&parcel)?);
                } else {
                    print_parcel(&parcel);
                }
            }
            None => {
                eprintln!("No parcel matched: {input}");
                std::process::exit(1);
            }
        },
        Commands::Jurisdiction { x, y } => {
            let jurisdiction = engine.classify_jurisdiction(Point { x, y }).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&jurisdiction)?);
            } else {
                print_jurisdiction(&jurisdiction);
            }
        }
        Commands::Zoning { input } => {
            let outcome = engine.lookup_zoning(&input).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_zoning(&outcome);
            }
        }
        Commands::Overlays { input } => {
            let hits = engine.lookup_overlays(&input).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                print_overlays(&hits);
            }
        }
        Commands::Assessor { input } => {
            let outcome = engine.lookup_assessor(&input).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_assessor(&outcome);
            }
        }
        Commands::CacheStats => {
            let stats = engine.cache_stats();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "{:<15} {:>8} {:>10} {:>8}",
                    "CACHE", "ENTRIES", "CAPACITY", "TTL(S)"
                );
                println!("{}", "-".repeat(46));
                for cache in &stats {
                    println!(
                        "{:<15} {:>8} {:>10} {:>8}",
                        cache.name, cache.entries, cache.capacity, cache.ttl_seconds
                    );
                }
            }
        }
    }

    Ok(())
}

fn build_engine(providers: Option<&str>) -> Result<Engine, Box<dyn std::error::Error>> {
    let registry = match providers {
        Some(path) => match ProviderRegistry::load_file(path) {
            Ok(registry) => {
                log::info!("loaded {} provider(s) from {path}", registry.len());
                registry
            }
            Err(e) => {
                log::error!("could not load providers from {path}: {e}; using builtin");
                ProviderRegistry::builtin()
            }
        },
        None => ProviderRegistry::load(),
    };
    Ok(Engine::new(
        Arc::new(ArcgisClient::new()?),
        CountyConfig::la_county(),
        registry,
    ))
}

fn print_report(report: &PropertyReport) {
    match &report.parcel {
        Some(parcel) => print_parcel(parcel),
        None => println!("No parcel matched."),
    }
    if let Some(jurisdiction) = &report.jurisdiction {
        println!();
        print_jurisdiction(jurisdiction);
    }
    println!();
    print_zoning(&report.zoning);
    println!();
    print_overlays(&report.overlays);
    println!();
    print_assessor(&report.assessor);
    if !report.notes.is_empty() {
        println!();
        for note in &report.notes {
            println!("note: {note}");
        }
    }
}

fn print_parcel(parcel: &ParcelFeature) {
    println!("Parcel {} (AIN {})", parcel.apn, parcel.ain);
    if let Some(address) = &parcel.situs_address {
        let mut line = address.clone();
        if let Some(city) = &parcel.situs_city {
            line.push_str(", ");
            line.push_str(city);
        }
        if let Some(zip) = &parcel.situs_zip {
            line.push(' ');
            line.push_str(zip);
        }
        println!("  {line}");
    }
    if let Some(sq_m) = area(&parcel.polygon) {
        println!("  footprint ~{sq_m:.0} sq m");
    }
}

fn print_jurisdiction(jurisdiction: &Jurisdiction) {
    match jurisdiction.kind {
        JurisdictionKind::City => {
            println!("Jurisdiction: {} (incorporated city)", jurisdiction.name);
        }
        JurisdictionKind::County => {
            println!("Jurisdiction: {} (county land)", jurisdiction.name);
        }
        JurisdictionKind::Error => {
            let detail = jurisdiction
                .note
                .as_deref()
                .unwrap_or("classification failed");
            println!("Jurisdiction: unknown ({detail})");
        }
    }
}

fn print_zoning(outcome: &ZoningOutcome) {
    match outcome {
        ZoningOutcome::Found { record } => {
            let card = record.card();
            println!("Zoning ({}):", card.jurisdiction);
            print_row("zone", card.zone.as_deref());
            print_row("description", card.zone_description.as_deref());
            print_row("general plan", card.general_plan.as_deref());
            print_row("plan detail", card.general_plan_description.as_deref());
            print_row("community", card.community_plan.as_deref());
            print_row("specific plan", card.specific_plan.as_deref());
            if let Some(method) = card.method {
                println!("  matched by {method} query");
            }
        }
        ZoningOutcome::ViewerOnly { note, viewer, .. } => {
            println!("Zoning: {note}");
            if let Some(viewer) = viewer {
                println!("  viewer: {viewer}");
            }
        }
        ZoningOutcome::NotFound { note } => println!("Zoning: {note}"),
    }
}

fn print_overlays(hits: &[OverlayHit]) {
    if hits.is_empty() {
        println!("Overlays: none found");
        return;
    }
    println!("Overlays ({}):", hits.len());
    for hit in hits {
        println!("  {:<28} {}", hit.label, hit.summary);
    }
}

fn print_assessor(outcome: &AssessorOutcome) {
    match outcome {
        AssessorOutcome::Found { record, links } => {
            println!("Assessor roll ({}):", record.apn);
            print_assessor_record(record);
            print_links(links);
        }
        AssessorOutcome::NotFound { note, links } => {
            println!("Assessor: {note}");
            print_links(links);
        }
    }
}

fn print_assessor_record(record: &AssessorRecord) {
    print_row("use", record.use_description.as_deref());
    print_row("use code", record.use_code.as_deref());
    if let Some(value) = record.land_value {
        println!("  {:<14} ${value:.0}", "land value");
    }
    if let Some(value) = record.improvement_value {
        println!("  {:<14} ${value:.0}", "improvements");
    }
    if let Some(year) = record.year_built {
        println!("  {:<14} {year}", "year built");
    }
    if let Some(sqft) = record.building_sqft {
        println!("  {:<14} {sqft:.0} sq ft", "building");
    }
    if let Some(units) = record.units {
        println!("  {:<14} {units}", "units");
    }
}

fn print_links(links: &[String]) {
    for link in links {
        println!("  {link}");
    }
}

fn print_row(label: &str, value: Option<&str>) {
    if let Some(value) = value {
        println!("  {label:<14} {value}");
    }
}
