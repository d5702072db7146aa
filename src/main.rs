use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use fieldmap::camera::{Camera, Size};
use fieldmap::cluster::ClusterGroup;
use fieldmap::config::MapConfig;
use fieldmap::editor::Editor;
use fieldmap::engine::EngineCore;
use fieldmap::error::MapError;
use fieldmap::polygon::SaveReport;
use fieldmap::snapshot::{ReplaySummary, decode_markers, decode_polygons, decode_script, replay};
use serde::Serialize;
use tracing_subscriber::EnvFilter;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid size `{0}`; expected WIDTHxHEIGHT")]
    InvalidSize(String),
    #[error("{0}")]
    Map(#[from] MapError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "fieldmap", about = "Offline tools for the field map engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cluster a marker snapshot at a given zoom.
    Clusters(ClustersArgs),
    /// Run an editor script and print the save report.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct ClustersArgs {
    /// JSON array of markers.
    #[arg(long)]
    markers: PathBuf,

    #[arg(long, env = "FIELDMAP_ZOOM", default_value_t = 1.0)]
    zoom: f64,

    /// Viewport size in CSS pixels, e.g. `1280x720`.
    #[arg(long, env = "FIELDMAP_VIEWPORT", value_parser = parse_size, default_value = "1280x720")]
    viewport: Size,

    /// Logical extent of the base image; omitted means a viewport-sized canvas.
    #[arg(long, env = "FIELDMAP_IMAGE", value_parser = parse_size)]
    image: Option<Size>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// JSON array of script steps.
    #[arg(long)]
    script: PathBuf,

    /// Stored polygons to start from.
    #[arg(long)]
    polygons: Option<PathBuf>,
}

#[derive(Serialize)]
struct ClustersOutput {
    zoom: f64,
    marker_scale: f64,
    clusters: Vec<ClusterGroup>,
}

#[derive(Serialize)]
struct ReplayOutput {
    summary: ReplaySummary,
    report: SaveReport,
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = MapConfig::from_env()?;
    match cli.command {
        Command::Clusters(args) => run_clusters(config, &args),
        Command::Replay(args) => run_replay(&args),
    }
}

fn run_clusters(config: MapConfig, args: &ClustersArgs) -> Result<(), CliError> {
    let markers = decode_markers(&read(&args.markers)?)?;
    let mut core = EngineCore::new(config);
    core.set_viewport(args.viewport.width, args.viewport.height);
    if let Some(image) = args.image {
        core.set_image_size(image.width, image.height);
    }
    core.viewport.set_camera(Camera { pan_x: 0.0, pan_y: 0.0, zoom: args.zoom });
    core.load_markers(markers);

    let frame = core.frame();
    tracing::info!(groups = frame.clusters.len(), zoom = frame.camera.zoom, "clusters computed");
    print_json(&ClustersOutput { zoom: frame.camera.zoom, marker_scale: frame.marker_scale, clusters: frame.clusters })
}

fn run_replay(args: &ReplayArgs) -> Result<(), CliError> {
    let steps = decode_script(&read(&args.script)?)?;
    let mut editor = Editor::new();
    if let Some(path) = &args.polygons {
        editor.load_polygons(&decode_polygons(&read(path)?)?);
    }
    let summary = replay(&mut editor, &steps);
    tracing::info!(applied = summary.applied, ignored = summary.ignored, "script replayed");
    print_json(&ReplayOutput { summary, report: editor.save() })
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_owned(), source })
}

fn parse_size(raw: &str) -> Result<Size, CliError> {
    let invalid = || CliError::InvalidSize(raw.to_owned());
    let (w, h) = raw.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: f64 = w.trim().parse().map_err(|_| invalid())?;
    let height: f64 = h.trim().parse().map_err(|_| invalid())?;
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(invalid());
    }
    Ok(Size::new(width, height))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
