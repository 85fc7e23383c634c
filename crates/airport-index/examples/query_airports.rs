//! Example: Query an airport GeoJSON dataset.
//!
//! Usage:
//!   cargo run --example query_airports -- airports.geojson nearest -122.33 47.61 -k 3
//!   cargo run --example query_airports -- airports.geojson code LHR
//!   cargo run --example query_airports -- airports.geojson bbox 170 -50 -170 -30
//!   cargo run --example query_airports -- airports.geojson --config repair.yaml diagnostics
//!
//! Set `RUST_LOG=airport_index=debug` to see every rejected record.

use airport_index::{AirportIndex, IndexConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "query_airports", about = "Query an airport GeoJSON dataset")]
struct Args {
    /// GeoJSON FeatureCollection of airports.
    dataset: PathBuf,

    /// YAML index config.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    query: Query,
}

#[derive(Subcommand)]
enum Query {
    /// Nearest airports to a point.
    Nearest {
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(short, default_value_t = 1)]
        k: usize,
    },
    /// Airports within a radius of a point.
    Radius {
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        radius_km: f64,
    },
    /// Exact code lookup.
    Code { iata: String },
    /// Code or city suggestions.
    Complete {
        prefix: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Airports inside a box; min_lon > max_lon crosses the antimeridian.
    Bbox {
        #[arg(allow_hyphen_values = true)]
        min_lon: f64,
        #[arg(allow_hyphen_values = true)]
        min_lat: f64,
        #[arg(allow_hyphen_values = true)]
        max_lon: f64,
        #[arg(allow_hyphen_values = true)]
        max_lat: f64,
    },
    /// Print build diagnostics as JSON.
    Diagnostics,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    airport_index::telemetry::describe_metrics();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> airport_index::Result<()> {
    let config = match &args.config {
        Some(path) => IndexConfig::from_yaml_path(path)?,
        None => IndexConfig::default(),
    };

    println!("Loading {}...", args.dataset.display());
    let start = Instant::now();
    let index = AirportIndex::from_geojson_path_with_config(&args.dataset, &config)?;
    let diagnostics = index.diagnostics();
    println!(
        "Indexed {} of {} airports in {:.3}s ({} rejected, {} low-confidence codes)",
        index.len(),
        diagnostics.input_count,
        start.elapsed().as_secs_f64(),
        diagnostics.rejected_count(),
        diagnostics.low_confidence.len()
    );

    match args.query {
        Query::Nearest { lon, lat, k } => {
            for n in index.find_nearest(lon, lat, k)? {
                println!("{:>6.1} km  {}", n.distance_km, describe(n.record));
            }
        }
        Query::Radius { lon, lat, radius_km } => {
            for n in index.find_within_radius(lon, lat, radius_km)? {
                println!("{:>6.1} km  {}", n.distance_km, describe(n.record));
            }
        }
        Query::Code { iata } => match index.find_by_code(&iata) {
            Some(record) => println!("{}", describe(record)),
            None => println!("No airport with code {:?}", iata),
        },
        Query::Complete { prefix, limit } => {
            for record in index.autocomplete(&prefix, limit) {
                println!("{}", describe(record));
            }
        }
        Query::Bbox {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        } => {
            let mut count = 0;
            for record in index.find_in_bounding_box(min_lon, min_lat, max_lon, max_lat)? {
                println!("{}", describe(record));
                count += 1;
            }
            println!("{} airports in box", count);
        }
        Query::Diagnostics => {
            println!("{}", serde_json::to_string_pretty(diagnostics)?);
        }
    }

    Ok(())
}

fn describe(record: &airport_index::AirportRecord) -> String {
    format!(
        "{:<4} {} ({}, {}) [{:.4}, {:.4}]",
        record.iata, record.name, record.city, record.country, record.longitude, record.latitude
    )
}
