//! pagetrack CLI — replay recorded frame observations through the tracking
//! pipeline.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use pagetrack::{
    run_frames, FrameObservation, FrameSource, GateConfig, InMemoryCatalog, PageTracker, Point,
    Quad, StabilizerConfig, TargetGeometry, TemplateCatalog, TrackerConfig,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

const FRAMES_SCHEMA_V1: &str = "pagetrack.frames.v1";

#[derive(Parser)]
#[command(name = "pagetrack")]
#[command(about = "Marker-anchored page tracking: replay frames, inspect catalogs, test projections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded frame stream and write per-frame results.
    Track(CliTrackArgs),

    /// Print the entries of a template catalog.
    CatalogInfo {
        /// Path to the catalog JSON.
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Project a catalog template through four marker corners.
    ProjectTest {
        /// Path to the catalog JSON.
        #[arg(long)]
        catalog: PathBuf,

        /// Payload string to look up.
        #[arg(long)]
        payload: String,

        /// Marker corners as x1,y1,x2,y2,x3,y3,x4,y4 (TL,TR,BR,BL).
        #[arg(long)]
        corners: String,
    },
}

#[derive(Debug, Clone, Args)]
struct CliTrackArgs {
    /// Path to the recorded frames (JSON, pagetrack.frames.v1).
    #[arg(long)]
    frames: PathBuf,

    /// Path to the template catalog (JSON, pagetrack.catalog.v1).
    #[arg(long)]
    catalog: PathBuf,

    /// Path to write per-frame results (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Previous-output weight of the exponential smoother.
    #[arg(long, default_value = "0.6")]
    smoothing_factor: f64,

    /// Corner displacement (pixels) above which a new estimate is rejected.
    #[arg(long, default_value = "50.0")]
    jump_threshold_px: f64,

    /// Median filter look-back window (quads).
    #[arg(long, default_value = "5")]
    median_window: usize,

    /// Consecutive matched frames required to trigger capture.
    #[arg(long, default_value = "30")]
    required_frames: u32,

    /// Completion fraction at which status switches to "capturing".
    #[arg(long, default_value = "0.33")]
    capturing_threshold: f64,
}

/// Recorded scanning session: display geometry plus the per-frame
/// observations captured from the camera/decoder boundary.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplayFile {
    schema: String,
    target: TargetGeometry,
    frames: Vec<FrameObservation>,
}

impl ReplayFile {
    fn from_json_file(path: &Path) -> CliResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let replay: ReplayFile = serde_json::from_str(&json)?;
        if replay.schema != FRAMES_SCHEMA_V1 {
            return Err(format!(
                "unsupported frames schema {:?}, expected {:?}",
                replay.schema, FRAMES_SCHEMA_V1
            )
            .into());
        }
        Ok(replay)
    }
}

struct ReplaySource {
    frames: std::vec::IntoIter<FrameObservation>,
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Option<FrameObservation> {
        self.frames.next()
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Track(args) => run_track(&args),
        Commands::CatalogInfo { catalog } => run_catalog_info(&catalog),
        Commands::ProjectTest {
            catalog,
            payload,
            corners,
        } => run_project_test(&catalog, &payload, &corners),
    }
}

// ── track ────────────────────────────────────────────────────────────────

fn run_track(args: &CliTrackArgs) -> CliResult<()> {
    let catalog = InMemoryCatalog::from_json_file(&args.catalog)?;
    tracing::info!("Loaded {} templates from {}", catalog.len(), args.catalog.display());

    let replay = ReplayFile::from_json_file(&args.frames)?;
    tracing::info!("Replaying {} frames from {}", replay.frames.len(), args.frames.display());

    let config = TrackerConfig {
        stabilizer: StabilizerConfig {
            smoothing_factor: args.smoothing_factor,
            jump_threshold_px: args.jump_threshold_px,
            median_window: args.median_window,
        },
        gate: GateConfig {
            required_frames: args.required_frames,
            capturing_threshold: args.capturing_threshold,
        },
    };

    let mut tracker = PageTracker::new(catalog, config);
    tracker.set_target_geometry(replay.target);
    let mut source = ReplaySource {
        frames: replay.frames.into_iter(),
    };
    let results = run_frames(&mut tracker, &mut source);

    let matches = results.iter().filter(|r| r.match_found).count();
    let captures = results.iter().filter(|r| r.capture_triggered).count();
    tracing::info!(
        "{} frames: {} matched, {} capture trigger(s), {} projection failure(s)",
        results.len(),
        matches,
        captures,
        tracker.projection_failures()
    );

    let file = std::fs::File::create(&args.out)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &results)?;
    tracing::info!("Results written to {}", args.out.display());
    Ok(())
}

// ── catalog-info ─────────────────────────────────────────────────────────

fn run_catalog_info(path: &Path) -> CliResult<()> {
    let catalog = InMemoryCatalog::from_json_file(path)?;
    println!("Catalog: {} ({} templates)", path.display(), catalog.len());
    let mut entries: Vec<_> = catalog.entries().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (payload, template) in entries {
        let r = template.page.bounding_rect();
        println!(
            "  {:24} id={:16} page {:.2}x{:.2} marker units at ({:.2}, {:.2})",
            payload,
            template.id,
            r.width(),
            r.height(),
            r.left,
            r.top
        );
    }
    Ok(())
}

// ── project-test ─────────────────────────────────────────────────────────

fn run_project_test(catalog_path: &Path, payload: &str, corners: &str) -> CliResult<()> {
    let catalog = InMemoryCatalog::from_json_file(catalog_path)?;
    let template = catalog
        .lookup(payload)
        .ok_or_else(|| -> CliError { format!("payload {:?} not in catalog", payload).into() })?;

    let values: Vec<f64> = corners
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| -> CliError { format!("invalid corner list: {}", e).into() })?;
    if values.len() != 8 {
        return Err(format!("expected 8 corner values, got {}", values.len()).into());
    }
    let marker = Quad::new(
        Point::new(values[0], values[1]),
        Point::new(values[2], values[3]),
        Point::new(values[4], values[5]),
        Point::new(values[6], values[7]),
    );

    let page = pagetrack::project_template(&marker, &template.page)?;
    println!("Template:     {}", template.id);
    println!("Marker rot:   {:.2}°", marker.rotation_degrees());
    for (name, p) in [
        ("top-left", page.top_left),
        ("top-right", page.top_right),
        ("bottom-right", page.bottom_right),
        ("bottom-left", page.bottom_left),
    ] {
        println!("  {:13} ({:.2}, {:.2})", name, p.x, p.y);
    }
    Ok(())
}
