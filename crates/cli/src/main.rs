//! geoweave CLI - headless front end for the geospatial workbench

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use geo_types::Geometry;
use geoweave_codec::{ExportFormat, InputFile};
use geoweave_core::transform::extent_to_geographic;
use geoweave_core::{GeoBBox, GeometryFamily};
use geoweave_engine::{
    EngineEvent, LayerId, NoticeLevel, ReqwestWorkbench, Workbench, WorkbenchConfig,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "geoweave")]
#[command(author, version, about = "Geospatial data workbench", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "geoweave.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode vector files and print a layer summary
    Import {
        /// Input files (a .shp needs its .dbf alongside)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Import files and export them in another format
    Convert {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output format: geojson, kml, shapefile
        #[arg(short, long, default_value = "geojson")]
        to: String,
        /// Output file or directory
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Fetch OpenStreetMap categories inside a polygon
    Osm {
        /// GeoJSON file whose first polygon bounds the query
        #[arg(short, long)]
        polygon: PathBuf,
        /// Comma-separated category ids (buildings, roads, railways, water, green, amenities)
        #[arg(short = 'k', long, value_delimiter = ',', required = true)]
        categories: Vec<String>,
        /// Output directory, one GeoJSON per category
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List the layers a WMS server advertises
    Capabilities {
        /// Server base URL (e.g. https://host/geoserver)
        url: String,
    },
    /// Search the STAC catalog and save scene footprints
    Stac {
        /// Bounding box as west,south,east,north in degrees
        #[arg(short, long, allow_hyphen_values = true)]
        bbox: String,
        /// Output GeoJSON file
        #[arg(short, long)]
        out: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print every pending notice from the engine.
fn print_notices(events: &Receiver<EngineEvent>) {
    for event in events.try_iter() {
        if let EngineEvent::Notice(notice) = event {
            let tag = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Success => "ok",
                NoticeLevel::Warning => "warning",
                NoticeLevel::Error => "error",
            };
            eprintln!("[{}] {}", tag, notice.message);
        }
    }
}

fn read_inputs(paths: &[PathBuf]) -> Result<Vec<InputFile>> {
    paths
        .iter()
        .map(|p| InputFile::read(p).with_context(|| format!("Failed to read {}", p.display())))
        .collect()
}

fn parse_bbox(s: &str) -> Result<GeoBBox> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid bbox '{}'", s))?;
    let [west, south, east, north] = parts[..] else {
        bail!("bbox needs four values: west,south,east,north");
    };
    Ok(GeoBBox::new(south, west, north, east))
}

fn first_polygon(path: &Path) -> Result<Geometry<f64>> {
    let file = InputFile::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let datasets = geoweave_codec::import(&[file]).context("Failed to decode polygon file")?;
    datasets
        .into_iter()
        .flat_map(|d| d.features.into_iter())
        .filter_map(|f| f.geometry)
        .find(|g| matches!(g, Geometry::Polygon(_)))
        .with_context(|| format!("{} contains no polygon", path.display()))
}

/// Write a layer as GeoJSON into `dir`, named after the layer.
fn write_layer(wb: &ReqwestWorkbench, id: &LayerId, dir: &Path) -> Result<PathBuf> {
    let artifact = wb.export_layers(std::slice::from_ref(id), ExportFormat::GeoJson)?;
    let path = dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn print_layer_summary(wb: &ReqwestWorkbench, id: &LayerId) {
    let Some(layer) = wb.registry().get(id) else {
        return;
    };
    let Some(features) = layer.features() else {
        return;
    };
    let mut families: BTreeMap<GeometryFamily, usize> = BTreeMap::new();
    for feature in features.iter() {
        if let Some(family) = feature.family() {
            *families.entry(family).or_default() += 1;
        }
    }
    println!("{} ({} features)", layer.name, features.len());
    for (family, count) in families {
        println!("  {:?}: {}", family, count);
    }
    if let Some(extent) = features.extent() {
        let [w, s, e, n] = extent_to_geographic(&extent).to_stac();
        println!("  Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})", w, s, e, n);
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = WorkbenchConfig::from_file_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let mut wb = Workbench::connect(config).context("Failed to set up the HTTP client")?;
    let events = wb.subscribe();
    let start = Instant::now();

    let outcome = run(&mut wb, cli.command).await;
    print_notices(&events);
    outcome?;

    info!("Done in {:.2?}", start.elapsed());
    Ok(())
}

async fn run(wb: &mut ReqwestWorkbench, command: Commands) -> Result<()> {
    match command {
        // ── Import ───────────────────────────────────────────────────
        Commands::Import { files } => {
            let inputs = read_inputs(&files)?;
            let ids = wb.import_files(&inputs)?;
            for id in &ids {
                print_layer_summary(wb, id);
            }
        }

        // ── Convert ──────────────────────────────────────────────────
        Commands::Convert { files, to, out } => {
            let format: ExportFormat = to.parse()?;
            let inputs = read_inputs(&files)?;
            let ids = wb.import_files(&inputs)?;
            if ids.is_empty() {
                bail!("Nothing to convert");
            }
            let artifact = wb.export_layers(&ids, format)?;
            let path = if out.is_dir() {
                out.join(&artifact.file_name)
            } else {
                out
            };
            std::fs::write(&path, &artifact.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} saved to: {}", format, path.display());
        }

        // ── OSM ──────────────────────────────────────────────────────
        Commands::Osm {
            polygon,
            categories,
            out,
        } => {
            let polygon = first_polygon(&polygon)?;
            std::fs::create_dir_all(&out)
                .with_context(|| format!("Failed to create {}", out.display()))?;

            let pb = spinner("Querying Overpass...");
            let fetched = wb.fetch_osm(&polygon, &categories).await;
            pb.finish_and_clear();

            for id in fetched? {
                let path = write_layer(wb, &id, &out)?;
                print_layer_summary(wb, &id);
                println!("  saved to: {}", path.display());
            }
        }

        // ── Capabilities ─────────────────────────────────────────────
        Commands::Capabilities { url } => {
            let pb = spinner("Requesting capabilities...");
            let layers = wb.discover(&url).await;
            pb.finish_and_clear();

            let layers = layers?;
            if let Some(base) = wb.discovered().base_url() {
                println!("Server: {}", base);
            }
            for layer in layers {
                println!("  {:<40} {}", layer.remote_name, layer.title);
            }
        }

        // ── STAC ─────────────────────────────────────────────────────
        Commands::Stac { bbox, out } => {
            let bbox = parse_bbox(&bbox)?;
            let pb = spinner("Searching catalog...");
            let found = wb.search_stac_in(bbox).await;
            pb.finish_and_clear();

            let Some(id) = found? else {
                return Ok(());
            };
            let artifact = wb.export_layers(&[id.clone()], ExportFormat::GeoJson)?;
            std::fs::write(&out, &artifact.bytes)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            print_layer_summary(wb, &id);
            println!("Footprints saved to: {}", out.display());
        }
    }
    Ok(())
}
