use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wpalt_cli::RouteDocument;
use wpalt_core::{
    plan_route, prepare_route, DouglasPeucker, GeoPoint, PlannerConfig, Waypoint, DEFAULT_ANOMALY_FLOOR_M,
    DEFAULT_MAX_PASSES, DEFAULT_SIMPLIFY_TOLERANCE_M,
};
use wpalt_terrain::{load_terrain, TerrainConfig, TerrainSource};

/// Adjusts waypoint altitudes so every leg keeps a minimum clearance over terrain
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input route file (.mission or .json)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output route file
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Minimum altitude above any terrain between two waypoints, meters
    #[arg(long = "min-alt", alias = "minAlt")]
    min_alt: u32,

    /// Profile simplification tolerance, meters
    #[arg(long, default_value_t = DEFAULT_SIMPLIFY_TOLERANCE_M)]
    tolerance: f64,

    /// Terrain samples at or below this elevation are discarded
    #[arg(long, default_value_t = DEFAULT_ANOMALY_FLOOR_M, allow_negative_numbers = true)]
    anomaly_floor: f64,

    /// Tightening passes allowed per leg
    #[arg(long, default_value_t = DEFAULT_MAX_PASSES)]
    max_passes: usize,

    /// Elevation provider URL (overrides WPALT_TERRAIN_URL)
    #[arg(long)]
    terrain_url: Option<String>,

    /// Directory for downloaded terrain grids (overrides WPALT_TERRAIN_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Terrain sampling distance along legs, meters
    #[arg(long)]
    sample_spacing: Option<f64>,

    /// Write the full plan with per-leg reports as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("wpalt=info".parse()?))
        .init();

    tracing::warn!("You are using this application at your own risk! No guarantees!");

    let args = Args::parse();

    let mut terrain_config = TerrainConfig::from_env();
    if let Some(url) = args.terrain_url {
        terrain_config.provider_url = url;
    }
    if let Some(dir) = args.cache_dir {
        terrain_config.cache_dir = Some(dir);
    }
    if let Some(spacing) = args.sample_spacing {
        terrain_config.sample_spacing_m = spacing;
    }

    let planner_config = PlannerConfig {
        min_clearance_m: args.min_alt,
        anomaly_floor_m: args.anomaly_floor,
        simplify_tolerance_m: args.tolerance,
        max_solver_passes: args.max_passes,
    };
    planner_config.validate()?;

    let document = RouteDocument::load(&args.input)
        .with_context(|| format!("failed to load route {}", args.input.display()))?;
    tracing::info!(
        "Loaded {} waypoints from {}",
        document.waypoints().len(),
        args.input.display()
    );

    let route = prepare_route(document.waypoints().to_vec())?;
    let points: Vec<GeoPoint> = route.iter().map(Waypoint::position).collect();

    let client = reqwest::Client::new();
    let provider = load_terrain(&client, &terrain_config, &points)
        .await
        .context("failed to obtain terrain data")?;
    match &provider {
        TerrainSource::Grid(grid) => tracing::info!(
            "Sampling legs every {:.0} m over a {:.0} m terrain grid",
            grid.sample_spacing_m(),
            grid.grid().spacing_m()
        ),
        TerrainSource::Profiles(profiles) => tracing::info!(
            "Sampling legs every {:.0} m from direct elevation lookups",
            profiles.sample_spacing_m()
        ),
    }

    let plan = plan_route(&provider, &DouglasPeucker, route, &planner_config)?;
    tracing::info!("Anchor ground elevation {} m", plan.anchor.elevation_m());
    for leg in &plan.legs {
        tracing::info!(
            "Leg #{} -> #{}: {:.0} m, {} profile points, {} dropped, end {} after {} passes",
            leg.from,
            leg.to,
            leg.distance_m,
            leg.profile.len(),
            leg.dropped_samples,
            leg.end_altitude,
            leg.passes
        );
    }

    document
        .save(&args.output, &plan)
        .with_context(|| format!("failed to write route {}", args.output.display()))?;
    tracing::info!("Wrote corrected route to {}", args.output.display());

    if let Some(path) = args.report {
        let report = serde_json::to_vec_pretty(&plan)?;
        std::fs::write(&path, report).with_context(|| format!("failed to write report {}", path.display()))?;
        tracing::info!("Wrote plan report to {}", path.display());
    }

    Ok(())
}
