//! Orbit CLI - spectral index batches over a region catalog

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use orbit_algorithms::imagery::{BandPair, SpectralIndex};
use orbit_cloud::{DateRange, LocalStore};
use orbit_core::io::read_catalog;
use orbit_core::Region;
use orbit_pipeline::{Orchestrator, PipelineConfig, RegionPoints, RegionResult};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "orbit")]
#[command(author, version, about = "Spectral index batches over a region catalog", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML config file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mean index per region from the earliest acquisition of a month
    MeanIndex(MeanIndexArgs),
    /// Classify a grid of points per region as water / non-water
    WaterPoints(WaterPointsArgs),
}

/// Arguments shared by both batches
#[derive(Args)]
struct BatchArgs {
    /// Region catalog (CSV with path/name + xmin, ymin, xmax, ymax)
    catalog: PathBuf,

    /// Scene directory laid out as <collection>/<YYYY-MM-DD>/<band>.tif
    #[arg(short, long)]
    store: PathBuf,

    /// Raster collection
    #[arg(long)]
    collection: Option<String>,

    /// Band pair as POSITIVE,NEGATIVE (e.g. B8,B4)
    #[arg(long, value_parser = parse_bands, conflicts_with = "index")]
    bands: Option<BandPair>,

    /// Named index whose conventional bands to use (ndvi, ndwi, mndwi)
    #[arg(long)]
    index: Option<SpectralIndex>,

    /// EPSG code of the catalog bounds
    #[arg(long)]
    crs: Option<u32>,

    /// Regions processed at once
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Per-call source timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MeanIndexArgs {
    #[command(flatten)]
    batch: BatchArgs,

    /// Acquisition year
    #[arg(long)]
    year: i32,

    /// Acquisition month (1-12)
    #[arg(long)]
    month: u32,

    /// Reduction cell size in raster units
    #[arg(long)]
    scale: Option<f64>,

    /// Cell budget before the scale is coarsened
    #[arg(long)]
    max_pixels: Option<u64>,
}

#[derive(Args)]
struct WaterPointsArgs {
    #[command(flatten)]
    batch: BatchArgs,

    /// First day of the date range (YYYY-MM-DD)
    #[arg(long)]
    start: String,

    /// Day after the date range (YYYY-MM-DD)
    #[arg(long)]
    end: String,

    /// Index value above which a point is water
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Requested points per region
    #[arg(short, long)]
    points: Option<usize>,

    /// Sampling resolution in raster units
    #[arg(long)]
    sample_scale: Option<f64>,

    /// EPSG code of the emitted points
    #[arg(long)]
    output_crs: Option<u32>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install the log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_bands(s: &str) -> std::result::Result<BandPair, String> {
    match s.split_once(',') {
        Some((a, b)) if !a.trim().is_empty() && !b.trim().is_empty() => {
            Ok(BandPair::new(a.trim(), b.trim()))
        }
        _ => Err(format!("expected POSITIVE,NEGATIVE band names, got '{s}'")),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

/// Apply the shared flags, returning the band pair to use.
fn apply_batch_args(config: &mut PipelineConfig, args: &BatchArgs, default_bands: BandPair) -> BandPair {
    if let Some(crs) = args.crs {
        config.crs.source = crs;
    }
    if let Some(n) = args.concurrency {
        config.runtime.concurrency = n;
    }
    if let Some(secs) = args.timeout {
        config.runtime.fetch_timeout_secs = secs;
    }
    match (&args.bands, args.index) {
        (Some(bands), _) => bands.clone(),
        (None, Some(index)) => index.default_bands(),
        (None, None) => default_bands,
    }
}

fn open_batch(config: PipelineConfig, args: &BatchArgs) -> Result<(Orchestrator, Vec<Region>)> {
    let regions = read_catalog(&args.catalog, &config.crs.source_crs())
        .with_context(|| format!("Failed to read catalog {}", args.catalog.display()))?;
    info!("Catalog: {} regions", regions.len());

    let store = LocalStore::open(&args.store)
        .with_context(|| format!("Failed to open store {}", args.store.display()))?;
    let orchestrator =
        Orchestrator::new(config, Arc::new(store)).context("Invalid pipeline configuration")?;
    Ok((orchestrator, regions))
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "no-data".to_string(), |v| format!("{v:.4}"))
}

fn print_means(results: &[RegionResult]) {
    let width = results.iter().map(|r| r.region_id.len()).max().unwrap_or(0).max(6);
    println!("{:<width$}  mean_index", "region");
    for r in results {
        println!("{:<width$}  {}", r.region_id, fmt_value(r.mean_index));
    }
}

fn print_points(results: &[RegionPoints]) {
    for region in results {
        let s = &region.summary;
        let fraction = s
            .fraction()
            .map_or_else(|| "n/a".to_string(), |f| format!("{:.1}%", f * 100.0));
        println!(
            "{}: {} points, {} water, {} no-data (water fraction {})",
            region.region_id(),
            s.sampled,
            s.water,
            s.no_data,
            fraction
        );
        for p in &region.points {
            let water = match p.is_on_water {
                Some(true) => "water",
                Some(false) => "land",
                None => "no-data",
            };
            println!(
                "  {:>12.6} {:>12.6}  {:>8}  {}",
                p.point.x(),
                p.point.y(),
                fmt_value(p.index_value),
                water
            );
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::MeanIndex(args) => {
            let default_bands = config.mean_index.band_pair();
            let bands = apply_batch_args(&mut config, &args.batch, default_bands);
            if let Some(scale) = args.scale {
                config.mean_index.scale = scale;
            }
            if let Some(max_pixels) = args.max_pixels {
                config.mean_index.max_pixels = max_pixels;
            }
            let collection = args
                .batch
                .collection
                .clone()
                .unwrap_or_else(|| config.mean_index.collection.clone());

            let (orchestrator, regions) = open_batch(config, &args.batch)?;
            let start = Instant::now();
            let pb = spinner(&format!("Reducing {} regions...", regions.len()));
            let results = orchestrator
                .compute_mean_index_per_region(&regions, &collection, args.year, args.month, &bands)
                .await
                .context("Mean index batch failed")?;
            pb.finish_and_clear();

            if args.batch.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_means(&results);
            }
            info!("Processing time: {:.2?}", start.elapsed());
        }

        Commands::WaterPoints(args) => {
            let default_bands = config.water.band_pair();
            let bands = apply_batch_args(&mut config, &args.batch, default_bands);
            config.water.bands = (bands.positive, bands.negative);
            if let Some(points) = args.points {
                config.water.total_points = points;
            }
            if let Some(scale) = args.sample_scale {
                config.water.sample_scale = scale;
            }
            if let Some(crs) = args.output_crs {
                config.crs.output = crs;
            }
            let threshold = args.threshold.unwrap_or(config.water.threshold);
            let collection = args
                .batch
                .collection
                .clone()
                .unwrap_or_else(|| config.water.collection.clone());
            let dates = DateRange::parse(&args.start, &args.end).context("Invalid date range")?;

            let (orchestrator, regions) = open_batch(config, &args.batch)?;
            let start = Instant::now();
            let pb = spinner(&format!("Sampling {} regions...", regions.len()));
            let results = orchestrator
                .classify_points_as_water(&regions, &collection, dates, threshold)
                .await
                .context("Water classification batch failed")?;
            pb.finish_and_clear();

            if args.batch.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_points(&results);
            }
            info!("Processing time: {:.2?}", start.elapsed());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_bands() {
        assert_eq!(parse_bands("B8, B4").unwrap(), BandPair::new("B8", "B4"));
        assert!(parse_bands("B8").is_err());
        assert!(parse_bands(",B4").is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "orbit", "water-points", "lakes.csv", "--store", "/data", "--start", "2015-01-01",
            "--end", "2016-01-01", "--index", "mndwi", "-j", "3", "--points", "25",
        ])
        .unwrap();
        let Commands::WaterPoints(args) = cli.command else {
            panic!("expected water-points");
        };

        let mut config = PipelineConfig::default();
        let default_bands = config.water.band_pair();
        let bands = apply_batch_args(&mut config, &args.batch, default_bands);
        assert_eq!(bands, BandPair::new("B3", "B6"));
        assert_eq!(config.runtime.concurrency, 3);
        assert_eq!(args.points, Some(25));
    }

    #[test]
    fn test_bands_and_index_conflict() {
        let parsed = Cli::try_parse_from([
            "orbit", "mean-index", "c.csv", "--store", "/data", "--year", "2021", "--month", "4",
            "--bands", "B8,B4", "--index", "ndvi",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(None), "no-data");
        assert_eq!(fmt_value(Some(0.5)), "0.5000");
    }
}
